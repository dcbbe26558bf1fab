use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::{PathBuf,Path};
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

// Write some compressible text into the temporary directory.
fn make_text(temp_dir: &tempfile::TempDir,name: &str) -> Result<PathBuf,Box<dyn std::error::Error>> {
    let mut txt = String::new();
    for i in 0..400 {
        txt += &format!("line {}: the quick brown fox jumps over the lazy dog\r\n",i % 37);
    }
    let path = temp_dir.path().join(name);
    std::fs::write(&path,txt)?;
    Ok(path)
}

fn pack_and_unpack(method: &str,key: Option<&str>) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_text(&temp_dir,"test.txt")?;
    let packed_path = temp_dir.path().join("test.rnc");
    let out_path = temp_dir.path().join("test.out");
    let mut cmd = Command::cargo_bin("propack")?;
    cmd.arg("pack")
        .arg("-m").arg(method)
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path);
    if let Some(k) = key {
        cmd.arg("-k").arg(k);
    }
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("packed"));
    let packed = std::fs::read(&packed_path)?;
    assert_eq!(&packed[0..3],"RNC".as_bytes());
    assert_eq!(packed[3],method.as_bytes()[0] - b'0');
    let mut cmd = Command::cargo_bin("propack")?;
    cmd.arg("unpack")
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(&out_path);
    if let Some(k) = key {
        cmd.arg("-k").arg(k);
    }
    cmd.assert().success();
    match (std::fs::read(in_path),std::fs::read(out_path)) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with reference")
    }
    Ok(())
}

#[test]
fn method1_round_trip() -> STDRESULT {
    pack_and_unpack("1",None)?;
    pack_and_unpack("1",Some("A55A"))
}

#[test]
fn method2_round_trip() -> STDRESULT {
    pack_and_unpack("2",None)?;
    pack_and_unpack("2",Some("0123"))
}

#[test]
fn missing_key() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_text(&temp_dir,"test.txt")?;
    let packed_path = temp_dir.path().join("test.rnc");
    Command::cargo_bin("propack")?
        .arg("pack").arg("-m").arg("1").arg("-k").arg("beef")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .assert()
        .success();
    Command::cargo_bin("propack")?
        .arg("unpack")
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(temp_dir.path().join("test.out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("KeyRequired"));
    Ok(())
}

#[test]
fn bad_key() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_text(&temp_dir,"test.txt")?;
    Command::cargo_bin("propack")?
        .arg("pack").arg("-m").arg("1").arg("-k").arg("xyz")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(temp_dir.path().join("test.rnc"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("4 hex digits"));
    Ok(())
}

#[test]
fn search_and_extract() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_text(&temp_dir,"test.txt")?;
    let packed_path = temp_dir.path().join("test.rnc");
    Command::cargo_bin("propack")?
        .arg("pack").arg("-m").arg("2")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .assert()
        .success();
    // bury the archive at offset 0x100 in an image
    let mut image = vec![0xe5;0x100];
    image.extend(std::fs::read(&packed_path)?);
    image.extend(vec![0xe5;0x80]);
    let image_path = temp_dir.path().join("disk.img");
    std::fs::write(&image_path,image)?;
    let out_dir = temp_dir.path().join("carved");
    Command::cargo_bin("propack")?
        .arg("search")
        .arg("-i").arg(&image_path)
        .arg("-o").arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("000100"));
    let carved = Path::new(&out_dir).join("data_000100.bin");
    assert_eq!(std::fs::read(carved)?,std::fs::read(in_path)?);
    Ok(())
}

#[test]
fn search_finds_nothing() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_text(&temp_dir,"test.txt")?;
    Command::cargo_bin("propack")?
        .arg("search")
        .arg("-i").arg(&in_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
    Ok(())
}
