use std::process::Command;

/// バイナリの起動表示用に `GIT_VERSION` を埋め込む
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let described = Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|v| !v.is_empty());

    // git 管理外（crate tarball など）ではパッケージのバージョンを使う
    let version = described.unwrap_or_else(|| {
        format!("v{}", std::env::var("CARGO_PKG_VERSION").unwrap_or_default())
    });

    println!("cargo:rustc-env=GIT_VERSION={}", version);
}
