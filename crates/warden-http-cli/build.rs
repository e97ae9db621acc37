use std::process::Command;

// Exposes the short commit (with a `-dirty` suffix for local changes) as
// GIT_HASH for `warden-http --version`. Empty outside a git checkout.
fn main() {
    let describe = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok());

    let hash = describe.as_deref().map(str::trim).unwrap_or_default();
    println!("cargo:rustc-env=GIT_HASH={hash}");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");
}
