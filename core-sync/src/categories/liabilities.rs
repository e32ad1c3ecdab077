//! Liabilities
//!
//! An account has at most one detail record per liability kind. Kinds the
//! provider did not report for an account are left untouched.

use super::CategoryStats;
use crate::error::Result;
use bridge_traits::provider::{
    first_for_account, CreditLiability, LiabilitiesSnapshot, MortgageLiability,
    StudentLoanLiability,
};
use core_ledger::stores::liabilities;
use core_ledger::Account;
use sqlx::SqliteConnection;

pub async fn apply_snapshot(
    conn: &mut SqliteConnection,
    accounts: &[Account],
    snapshot: &LiabilitiesSnapshot,
    now: i64,
) -> Result<CategoryStats> {
    let mut stats = CategoryStats::default();

    for account in accounts {
        let id = account.provider_account_id.as_str();
        stats += apply_account(
            conn,
            account,
            first_for_account(&snapshot.credit, id),
            first_for_account(&snapshot.mortgage, id),
            first_for_account(&snapshot.student, id),
            now,
        )
        .await?;
    }

    Ok(stats)
}

pub async fn apply_account(
    conn: &mut SqliteConnection,
    account: &Account,
    credit: Option<&CreditLiability>,
    mortgage: Option<&MortgageLiability>,
    student: Option<&StudentLoanLiability>,
    now: i64,
) -> Result<CategoryStats> {
    let mut stats = CategoryStats::default();

    if let Some(data) = credit {
        liabilities::upsert_credit(conn, &account.id, data, now).await?;
        stats.upserted += 1;
    }
    if let Some(data) = mortgage {
        liabilities::upsert_mortgage(conn, &account.id, data, now).await?;
        stats.upserted += 1;
    }
    if let Some(data) = student {
        liabilities::upsert_student_loan(conn, &account.id, data, now).await?;
        stats.upserted += 1;
    }

    Ok(stats)
}
