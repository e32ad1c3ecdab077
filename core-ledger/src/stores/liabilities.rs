//! Liability detail store
//!
//! Each liability-bearing account has at most one detail row per kind,
//! keyed by the account id.

use crate::error::{LedgerError, Result};
use crate::models::{
    decimal_to_text, parse_optional_decimal, AccountId, CreditDetail, MortgageDetail,
    StudentLoanDetail,
};
use bridge_traits::provider::{CreditLiability, MortgageLiability, StudentLoanLiability};
use chrono::NaiveDate;
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection};

#[derive(Debug, FromRow)]
struct CreditRow {
    account_id: String,
    is_overdue: Option<bool>,
    last_payment_amount: Option<String>,
    last_statement_balance: Option<String>,
    minimum_payment_amount: Option<String>,
    next_payment_due_date: Option<NaiveDate>,
    purchase_apr: Option<String>,
}

impl TryFrom<CreditRow> for CreditDetail {
    type Error = LedgerError;

    fn try_from(row: CreditRow) -> Result<Self> {
        Ok(CreditDetail {
            account_id: AccountId::from_string(&row.account_id)?,
            is_overdue: row.is_overdue,
            last_payment_amount: parse_optional_decimal(row.last_payment_amount)?,
            last_statement_balance: parse_optional_decimal(row.last_statement_balance)?,
            minimum_payment_amount: parse_optional_decimal(row.minimum_payment_amount)?,
            next_payment_due_date: row.next_payment_due_date,
            purchase_apr: parse_optional_decimal(row.purchase_apr)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct MortgageRow {
    account_id: String,
    loan_type_description: Option<String>,
    interest_rate_percentage: Option<String>,
    origination_principal_amount: Option<String>,
    next_monthly_payment: Option<String>,
    maturity_date: Option<NaiveDate>,
}

impl TryFrom<MortgageRow> for MortgageDetail {
    type Error = LedgerError;

    fn try_from(row: MortgageRow) -> Result<Self> {
        Ok(MortgageDetail {
            account_id: AccountId::from_string(&row.account_id)?,
            loan_type_description: row.loan_type_description,
            interest_rate_percentage: parse_optional_decimal(row.interest_rate_percentage)?,
            origination_principal_amount: parse_optional_decimal(
                row.origination_principal_amount,
            )?,
            next_monthly_payment: parse_optional_decimal(row.next_monthly_payment)?,
            maturity_date: row.maturity_date,
        })
    }
}

#[derive(Debug, FromRow)]
struct StudentLoanRow {
    account_id: String,
    loan_name: Option<String>,
    interest_rate_percentage: Option<String>,
    origination_principal_amount: Option<String>,
    outstanding_interest_amount: Option<String>,
    minimum_payment_amount: Option<String>,
    expected_payoff_date: Option<NaiveDate>,
}

impl TryFrom<StudentLoanRow> for StudentLoanDetail {
    type Error = LedgerError;

    fn try_from(row: StudentLoanRow) -> Result<Self> {
        Ok(StudentLoanDetail {
            account_id: AccountId::from_string(&row.account_id)?,
            loan_name: row.loan_name,
            interest_rate_percentage: parse_optional_decimal(row.interest_rate_percentage)?,
            origination_principal_amount: parse_optional_decimal(
                row.origination_principal_amount,
            )?,
            outstanding_interest_amount: parse_optional_decimal(row.outstanding_interest_amount)?,
            minimum_payment_amount: parse_optional_decimal(row.minimum_payment_amount)?,
            expected_payoff_date: row.expected_payoff_date,
        })
    }
}

pub async fn upsert_credit(
    conn: &mut SqliteConnection,
    account_id: &AccountId,
    data: &CreditLiability,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO credit_details (
            account_id, is_overdue, last_payment_amount, last_statement_balance,
            minimum_payment_amount, next_payment_due_date, purchase_apr, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (account_id) DO UPDATE SET
            is_overdue = excluded.is_overdue,
            last_payment_amount = excluded.last_payment_amount,
            last_statement_balance = excluded.last_statement_balance,
            minimum_payment_amount = excluded.minimum_payment_amount,
            next_payment_due_date = excluded.next_payment_due_date,
            purchase_apr = excluded.purchase_apr,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(account_id.as_str())
    .bind(data.is_overdue)
    .bind(decimal_to_text(data.last_payment_amount))
    .bind(decimal_to_text(data.last_statement_balance))
    .bind(decimal_to_text(data.minimum_payment_amount))
    .bind(data.next_payment_due_date)
    .bind(decimal_to_text(data.purchase_apr))
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn upsert_mortgage(
    conn: &mut SqliteConnection,
    account_id: &AccountId,
    data: &MortgageLiability,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO mortgage_details (
            account_id, loan_type_description, interest_rate_percentage,
            origination_principal_amount, next_monthly_payment, maturity_date, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (account_id) DO UPDATE SET
            loan_type_description = excluded.loan_type_description,
            interest_rate_percentage = excluded.interest_rate_percentage,
            origination_principal_amount = excluded.origination_principal_amount,
            next_monthly_payment = excluded.next_monthly_payment,
            maturity_date = excluded.maturity_date,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(account_id.as_str())
    .bind(&data.loan_type_description)
    .bind(decimal_to_text(data.interest_rate_percentage))
    .bind(decimal_to_text(data.origination_principal_amount))
    .bind(decimal_to_text(data.next_monthly_payment))
    .bind(data.maturity_date)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn upsert_student_loan(
    conn: &mut SqliteConnection,
    account_id: &AccountId,
    data: &StudentLoanLiability,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO student_loan_details (
            account_id, loan_name, interest_rate_percentage, origination_principal_amount,
            outstanding_interest_amount, minimum_payment_amount, expected_payoff_date,
            updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (account_id) DO UPDATE SET
            loan_name = excluded.loan_name,
            interest_rate_percentage = excluded.interest_rate_percentage,
            origination_principal_amount = excluded.origination_principal_amount,
            outstanding_interest_amount = excluded.outstanding_interest_amount,
            minimum_payment_amount = excluded.minimum_payment_amount,
            expected_payoff_date = excluded.expected_payoff_date,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(account_id.as_str())
    .bind(&data.loan_name)
    .bind(decimal_to_text(data.interest_rate_percentage))
    .bind(decimal_to_text(data.origination_principal_amount))
    .bind(decimal_to_text(data.outstanding_interest_amount))
    .bind(decimal_to_text(data.minimum_payment_amount))
    .bind(data.expected_payoff_date)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn find_credit<'e, E>(executor: E, account_id: &AccountId) -> Result<Option<CreditDetail>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, CreditRow>(
        r#"
        SELECT account_id, is_overdue, last_payment_amount, last_statement_balance,
               minimum_payment_amount, next_payment_due_date, purchase_apr
        FROM credit_details
        WHERE account_id = ?
        "#,
    )
    .bind(account_id.as_str())
    .fetch_optional(executor)
    .await?;

    row.map(CreditDetail::try_from).transpose()
}

pub async fn find_mortgage<'e, E>(
    executor: E,
    account_id: &AccountId,
) -> Result<Option<MortgageDetail>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, MortgageRow>(
        r#"
        SELECT account_id, loan_type_description, interest_rate_percentage,
               origination_principal_amount, next_monthly_payment, maturity_date
        FROM mortgage_details
        WHERE account_id = ?
        "#,
    )
    .bind(account_id.as_str())
    .fetch_optional(executor)
    .await?;

    row.map(MortgageDetail::try_from).transpose()
}

pub async fn find_student_loan<'e, E>(
    executor: E,
    account_id: &AccountId,
) -> Result<Option<StudentLoanDetail>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, StudentLoanRow>(
        r#"
        SELECT account_id, loan_name, interest_rate_percentage, origination_principal_amount,
               outstanding_interest_amount, minimum_payment_amount, expected_payoff_date
        FROM student_loan_details
        WHERE account_id = ?
        "#,
    )
    .bind(account_id.as_str())
    .fetch_optional(executor)
    .await?;

    row.map(StudentLoanDetail::try_from).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seed_account;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_credit_detail_is_replaced_in_place() {
        let (pool, _item, account) = seed_account("A1").await;
        let mut conn = pool.acquire().await.unwrap();

        let mut data = CreditLiability {
            account_id: "A1".to_string(),
            is_overdue: Some(false),
            last_payment_amount: Some(Decimal::new(5000, 2)),
            last_statement_balance: Some(Decimal::new(42000, 2)),
            minimum_payment_amount: Some(Decimal::new(2500, 2)),
            next_payment_due_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            purchase_apr: Some(Decimal::new(2199, 2)),
        };
        upsert_credit(&mut conn, &account.id, &data, 100).await.unwrap();

        data.is_overdue = Some(true);
        upsert_credit(&mut conn, &account.id, &data, 100).await.unwrap();

        let stored = find_credit(&mut *conn, &account.id).await.unwrap().unwrap();
        assert_eq!(stored.is_overdue, Some(true));
        assert_eq!(stored.purchase_apr, Some(Decimal::new(2199, 2)));
        assert_eq!(stored.next_payment_due_date, NaiveDate::from_ymd_opt(2024, 5, 1));

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM credit_details")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_mortgage_and_student_loan_details() {
        let (pool, _item, account) = seed_account("A1").await;
        let mut conn = pool.acquire().await.unwrap();

        upsert_mortgage(
            &mut conn,
            &account.id,
            &MortgageLiability {
                account_id: "A1".to_string(),
                loan_type_description: Some("fixed".to_string()),
                interest_rate_percentage: Some(Decimal::new(375, 2)),
                origination_principal_amount: Some(Decimal::new(250_000, 0)),
                next_monthly_payment: None,
                maturity_date: None,
            },
            100,
        )
        .await
        .unwrap();

        upsert_student_loan(
            &mut conn,
            &account.id,
            &StudentLoanLiability {
                account_id: "A1".to_string(),
                loan_name: Some("Consolidation".to_string()),
                interest_rate_percentage: None,
                origination_principal_amount: None,
                outstanding_interest_amount: Some(Decimal::new(1234, 2)),
                minimum_payment_amount: None,
                expected_payoff_date: None,
            },
            100,
        )
        .await
        .unwrap();

        let mortgage = find_mortgage(&mut *conn, &account.id).await.unwrap().unwrap();
        assert_eq!(mortgage.interest_rate_percentage, Some(Decimal::new(375, 2)));

        let loan = find_student_loan(&mut *conn, &account.id).await.unwrap().unwrap();
        assert_eq!(loan.loan_name.as_deref(), Some("Consolidation"));
        assert_eq!(loan.outstanding_interest_amount, Some(Decimal::new(1234, 2)));

        assert!(find_credit(&mut *conn, &account.id).await.unwrap().is_none());
    }
}
