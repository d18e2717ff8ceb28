//! Integration tests for debhub

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use predicates::prelude::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn debhub(config_dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("debhub");
        cmd.env("DEBHUB_CONFIG", config_dir.join("config.toml"));
        cmd
    }

    fn build_deb(control: &str) -> Vec<u8> {
        let mut tarball = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(control.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tarball
            .append_data(&mut header, "./control", control.as_bytes())
            .unwrap();
        let tarball = tarball.into_inner().unwrap();

        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&tarball).unwrap();
        let gz = gz.finish().unwrap();

        let mut deb = ar::Builder::new(Vec::new());
        deb.append(&ar::Header::new(b"debian-binary".to_vec(), 4), &b"2.0\n"[..])
            .unwrap();
        deb.append(&ar::Header::new(b"control.tar.gz".to_vec(), gz.len() as u64), gz.as_slice())
            .unwrap();
        deb.into_inner().unwrap()
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        debhub(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("APT repository"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        debhub(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("debhub"));
    }

    #[test]
    fn inspect_local_package() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("hello").join("v1.0");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hello_1.0_amd64.deb");
        std::fs::write(
            &path,
            build_deb("Package: hello\nVersion: 1.0\nArchitecture: amd64\n"),
        )
        .unwrap();

        debhub(temp.path())
            .arg("inspect")
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::starts_with(
                "Package: hello\nVersion: 1.0\nArchitecture: amd64\n",
            ))
            .stdout(predicate::str::contains(
                "Filename: download/v1.0/hello_1.0_amd64.deb\n",
            ))
            .stdout(predicate::str::contains("MD5Sum: "));
    }

    #[test]
    fn inspect_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.deb");
        std::fs::write(
            &path,
            build_deb("Package: hello\nVersion: 1.0\nArchitecture: all\n"),
        )
        .unwrap();

        debhub(temp.path())
            .args(["inspect", "--format", "json"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"md5sum\""))
            .stdout(predicate::str::contains("\"architecture\": \"all\""));
    }

    #[test]
    fn inspect_rejects_missing_architecture() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.deb");
        std::fs::write(&path, build_deb("Package: hello\nVersion: 1.0\n")).unwrap();

        debhub(temp.path())
            .arg("inspect")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("missing Architecture from control"));
    }

    #[test]
    fn inspect_rejects_non_package() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.deb");
        std::fs::write(&path, b"just some text").unwrap();

        debhub(temp.path())
            .arg("inspect")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid archive"));
    }

    #[test]
    fn index_rejects_non_release_url() {
        let temp = TempDir::new().unwrap();
        debhub(temp.path())
            .args(["index", "https://example.com/hello.deb"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid artifact reference"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[fetch]\ntimeout_secs = \"x\"\n").unwrap();

        debhub(temp.path())
            .args(["index", "https://example.com/hello.deb"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}
