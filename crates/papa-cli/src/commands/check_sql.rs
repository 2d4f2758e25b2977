//! `papa check-sql` - run the guard offline.

use anyhow::{Result, bail};
use papa_core::{GuardConfig, GuardMode};
use papa_sql::SqlGuard;

/// Print the verdict for `sql`. Rejection is an error so the exit code is non-zero.
pub fn run(config: &GuardConfig, sql: &str, permissive: bool) -> Result<()> {
    let mut config = config.clone();
    if permissive {
        config.mode = GuardMode::Permissive;
    }

    match SqlGuard::new(&config).check(sql) {
        Ok(checked) => {
            let operations: Vec<&str> = checked.operations.iter().map(|op| op.as_str()).collect();
            println!("✅ Accepted ({:?} mode)", config.mode);
            println!("   Statements: {}", operations.join(", "));
            if checked.tables.is_empty() {
                println!("   Tables: (none)");
            } else {
                println!("   Tables: {}", checked.tables.join(", "));
            }
            Ok(())
        }
        Err(e) => {
            println!("❌ Rejected ({:?} mode)", config.mode);
            bail!(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_select() {
        assert!(run(&GuardConfig::default(), "SELECT * FROM events", false).is_ok());
    }

    #[test]
    fn test_rejects_delete_unless_permissive() {
        let err = run(&GuardConfig::default(), "DELETE FROM events", false).unwrap_err();
        assert!(err.to_string().contains("DELETE"));
        assert!(run(&GuardConfig::default(), "DELETE FROM events", true).is_ok());
    }
}
