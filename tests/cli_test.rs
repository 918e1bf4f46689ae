//! CLI argument parsing and end-to-end command tests

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Notes</title><script>var tracking = 1;</script></head>
<body>
  <nav>Menu</nav>
  <div class="col col-12 grid-col-9-lg z1">
    <h1>Release notes</h1>
    <p>First&nbsp;paragraph</p>
    <p>Second<br>line</p>
    <style>.x { color: red; }</style>
  </div>
</body>
</html>"#;

/// Binary with config and downloads isolated in a temp dir
fn rolys(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rolys").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("HOME", home.path())
        .env_remove("ROLYS_DOWNLOAD_DIR")
        .env_remove("RUST_LOG");
    cmd
}

mod help {
    use super::*;

    #[test]
    fn shows_help() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("rolys"))
            .stdout(predicate::str::contains("extract-text"))
            .stdout(predicate::str::contains("download-images"))
            .stdout(predicate::str::contains("convert"));
    }

    #[test]
    fn shows_version() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("rolys"));
    }

    #[test]
    fn extract_text_requires_page() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .arg("extract-text")
            .assert()
            .failure()
            .stderr(predicate::str::contains("PAGE"));
    }

    #[test]
    fn convert_defaults_to_usd_to_cny() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["convert", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[default: usd]"))
            .stdout(predicate::str::contains("[default: cny]"));
    }
}

mod copy_address {
    use super::*;

    #[test]
    fn strips_query_and_fragment() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["copy-address", "https://example.com/docs/page?ref=abc#section"])
            .assert()
            .success()
            .stdout("https://example.com/docs/page\n")
            .stderr(predicate::str::contains("Address copied to clipboard!"));
    }

    #[test]
    fn json_output() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["--json", "copy-address", "http://example.com:8080/a?b=c"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"address":"http://example.com:8080/a"}"#,
            ));
    }

    #[test]
    fn refuses_special_pages() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["copy-address", "chrome://extensions/"])
            .assert()
            .failure()
            .stdout("")
            .stderr(predicate::str::contains("Cannot run on special pages"));
    }

    #[test]
    fn rejects_garbage() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["copy-address", "not a url"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("URL parsing failed"));
    }
}

mod extract_text {
    use super::*;

    fn saved_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }

    #[test]
    #[serial]
    fn saves_region_text() {
        let home = TempDir::new().unwrap();
        let page = home.path().join("page.html");
        std::fs::write(&page, PAGE).unwrap();
        let downloads = home.path().join("downloads");

        rolys(&home)
            .arg("--download-dir")
            .arg(&downloads)
            .arg("extract-text")
            .arg(&page)
            .assert()
            .success()
            .stderr(predicate::str::contains("Text extracted, file downloaded"));

        let files = saved_files(&downloads);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("page-text-"), "{}", name);
        assert!(name.ends_with(".txt"), "{}", name);

        let text = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(text, "Release notes\n\nFirst paragraph\n\nSecond\n\nline");
    }

    #[test]
    #[serial]
    fn download_dir_from_env() {
        let home = TempDir::new().unwrap();
        let page = home.path().join("page.html");
        std::fs::write(&page, PAGE).unwrap();
        let downloads = home.path().join("env-downloads");

        rolys(&home)
            .env("ROLYS_DOWNLOAD_DIR", &downloads)
            .arg("extract-text")
            .arg(&page)
            .assert()
            .success();

        assert_eq!(saved_files(&downloads).len(), 1);
    }

    #[test]
    #[serial]
    fn missing_region_fails_without_writing() {
        let home = TempDir::new().unwrap();
        let page = home.path().join("page.html");
        std::fs::write(&page, "<html><body><div class=\"col\">Hi</div></body></html>").unwrap();
        let downloads = home.path().join("downloads");

        rolys(&home)
            .arg("--download-dir")
            .arg(&downloads)
            .arg("extract-text")
            .arg(&page)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Content region not found"));

        assert!(saved_files(&downloads).is_empty());
    }

    #[test]
    #[serial]
    fn custom_selector() {
        let home = TempDir::new().unwrap();
        let page = home.path().join("page.html");
        std::fs::write(&page, "<html><body><article>Only this</article></body></html>").unwrap();
        let downloads = home.path().join("downloads");

        rolys(&home)
            .arg("--download-dir")
            .arg(&downloads)
            .args(["--selector", "article", "--json", "extract-text"])
            .arg(&page)
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""kind": "text""#))
            .stdout(predicate::str::contains(r#""success": true"#));

        let files = saved_files(&downloads);
        assert_eq!(std::fs::read_to_string(&files[0]).unwrap(), "Only this");
    }

    #[test]
    fn special_tab_url_is_refused() {
        let home = TempDir::new().unwrap();
        let page = home.path().join("page.html");
        std::fs::write(&page, PAGE).unwrap();

        rolys(&home)
            .args(["extract-text", "--tab-url", "about:blank"])
            .arg(&page)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cannot run on special pages"));
    }

    #[test]
    fn unreadable_page() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .arg("extract-text")
            .arg(home.path().join("missing.html"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read page"));
    }
}

mod download_images {
    use super::*;

    #[test]
    fn page_without_images_fails() {
        let home = TempDir::new().unwrap();
        let page = home.path().join("page.html");
        std::fs::write(&page, PAGE).unwrap();

        rolys(&home)
            .arg("--download-dir")
            .arg(home.path().join("downloads"))
            .arg("download-images")
            .arg(&page)
            .assert()
            .failure()
            .stderr(predicate::str::contains("No downloadable images found"));
    }
}

mod convert {
    use super::*;

    #[test]
    fn rejects_unknown_currency() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["convert", "10", "--from", "eur"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported currency"));
    }

    #[test]
    fn rejects_same_currency() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["convert", "10", "--from", "usd", "--to", "usd"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cannot convert USD to itself"));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let home = TempDir::new().unwrap();
        for amount in ["0", "-5"] {
            rolys(&home)
                .args(["convert", "--", amount])
                .env("ROLYS_RATES__BASE_URL", "http://127.0.0.1:1")
                .assert()
                .failure()
                .stderr(predicate::str::contains("is not a positive amount"));
        }
    }

    #[test]
    fn falls_back_to_default_rate_offline() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .env("ROLYS_RATES__BASE_URL", "http://127.0.0.1:1")
            .args(["--json", "convert", "10"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""display":"72.00""#))
            .stdout(predicate::str::contains(r#""source":"default""#));
    }
}

mod config {
    use super::*;

    #[test]
    fn path_is_under_config_home() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("rolys"))
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn set_then_get() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["config", "set", "rates.debounce_ms", "150"])
            .assert()
            .success();

        rolys(&home)
            .args(["config", "get", "rates.debounce_ms"])
            .assert()
            .success()
            .stdout("150\n");
    }

    #[test]
    fn unknown_key_fails() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["config", "get", "nope.key"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn show_prints_defaults() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("grid-col-9-lg"))
            .stdout(predicate::str::contains("rolys-images"));
    }

    #[test]
    fn reset_without_file_in_json_mode() {
        let home = TempDir::new().unwrap();
        rolys(&home)
            .args(["--json", "config", "reset"])
            .assert()
            .success()
            .stdout(predicate::str::contains("no_config"));
    }
}
