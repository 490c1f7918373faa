use std::io::Write;
use std::sync::Arc;

use stage_dict::error::Result;
use stage_dict::{str_code, HashDictionary};
use tempfile::tempdir;
use tracing_test::traced_test;

#[traced_test]
#[test]
fn load_from_disk() -> Result<()> {
    let dir = tempdir()?;
    let primary = dir.path().join("dictionary.txt");
    let aliases = dir.path().join("dictionary-aliases.txt");

    let mut file = std::fs::File::create(&primary)?;
    writeln!(file, "PRP_STAGE_CENTER")?;
    writeln!(file, "PRP_CBOX_01")?;
    drop(file);

    std::fs::write(&aliases, "PRP_CBOX_01 PRP_CARDBOARD_BOX_01\n")?;

    let dictionary = HashDictionary::load(&primary, &aliases)?;
    assert_eq!(dictionary.len(), 2);
    assert_eq!(
        dictionary.resolve(str_code("PRP_CBOX_01")),
        "PRP_CARDBOARD_BOX_01"
    );

    Ok(())
}

#[test]
fn missing_table_is_reported() {
    let dir = tempdir().unwrap();
    let result = HashDictionary::load(dir.path().join("nope.txt"), dir.path().join("nope2.txt"));

    assert!(matches!(
        result,
        Err(stage_dict::error::Error::TableNotFound { .. })
    ));
}

#[test]
fn shared_between_threads() -> Result<()> {
    let dictionary = Arc::new(HashDictionary::from_readers(
        "PRP_A\nPRP_B\n".as_bytes(),
        "".as_bytes(),
    )?);

    let handles = (0..4)
        .map(|_| {
            let dictionary = Arc::clone(&dictionary);
            std::thread::spawn(move || dictionary.resolve(str_code("PRP_B")).into_owned())
        })
        .collect::<Vec<_>>();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "PRP_B");
    }

    Ok(())
}
