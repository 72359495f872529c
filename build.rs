use std::process::Command;

fn main() {
    // DOTSTRAP_VERSION wins when set (release builds); otherwise describe the
    // checkout so local builds report something useful.
    if let Ok(version) = std::env::var("DOTSTRAP_VERSION") {
        println!("cargo:rustc-env=DOTSTRAP_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=DOTSTRAP_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=DOTSTRAP_VERSION");
}
