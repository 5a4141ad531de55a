use anyhow::Result;

use crate::config::{DiscardPolicy, StateConfig};

#[test]
fn test_defaults_keep_calls_arith_and_concat_strict() {
    let config = StateConfig::default();
    assert!(!config.discard.index);
    assert!(config.discard.arithmetic);
    assert!(config.discard.concat);
    assert_eq!(config.max_call_depth, 200);
}

#[test]
fn test_partial_toml_fills_defaults() -> Result<()> {
    let config = StateConfig::from_toml_str(
        r#"
            watch_stack = false

            [discard]
            index = true
        "#,
    )?;
    assert!(!config.watch_stack);
    assert_eq!(
        config.discard,
        DiscardPolicy {
            index: true,
            arithmetic: true,
            concat: true,
        }
    );
    assert_eq!(config.max_call_depth, 200);
    Ok(())
}

#[test]
fn test_zero_call_depth_rejected() {
    let err = StateConfig::from_toml_str("max_call_depth = 0").unwrap_err();
    assert!(err.to_string().contains("max_call_depth"));
}

#[test]
fn test_load_from_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.toml");
    std::fs::write(&path, "max_call_depth = 12\n[discard]\nconcat = false\n")?;
    let config = StateConfig::load(&path)?;
    assert_eq!(config.max_call_depth, 12);
    assert!(!config.discard.concat);
    Ok(())
}

#[test]
fn test_missing_file_reports_path() {
    let err = StateConfig::load("/definitely/not/here.toml").unwrap_err();
    assert!(err.to_string().contains("here.toml"));
}
