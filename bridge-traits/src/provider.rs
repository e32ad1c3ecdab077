//! Aggregation Provider Abstractions
//!
//! Contract between the sync core and the third-party account aggregation
//! service. The HTTP client behind it is supplied by the host; the core only
//! depends on the data shapes declared here.
//!
//! Every list-bearing record implements [`AccountScoped`] so callers can
//! partition a provider response per account.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Long-lived access credential issued by the provider for one item.
///
/// The value is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the raw credential. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Result of exchanging a one-time public token.
#[derive(Debug, Clone)]
pub struct TokenExchange {
    pub item_id: String,
    pub access_token: AccessToken,
}

/// Item metadata as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderItem {
    pub item_id: String,
    pub available_products: Vec<String>,
    pub billed_products: Vec<String>,
}

/// What the provider needs to serve item-scoped requests.
///
/// `cursor` is the incremental transactions cursor stored on the item; `None`
/// requests the full history.
#[derive(Debug, Clone)]
pub struct ItemHandle {
    pub item_id: String,
    pub access_token: AccessToken,
    pub cursor: Option<String>,
}

/// Records that belong to exactly one provider account.
pub trait AccountScoped {
    fn account_id(&self) -> &str;
}

/// Select the records belonging to `account_id`.
pub fn for_account<T: AccountScoped + Clone>(records: &[T], account_id: &str) -> Vec<T> {
    records
        .iter()
        .filter(|record| record.account_id() == account_id)
        .cloned()
        .collect()
}

/// First record belonging to `account_id`, if any.
pub fn first_for_account<'a, T: AccountScoped>(records: &'a [T], account_id: &str) -> Option<&'a T> {
    records.iter().find(|record| record.account_id() == account_id)
}

macro_rules! account_scoped {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl AccountScoped for $ty {
                fn account_id(&self) -> &str {
                    &self.account_id
                }
            }
        )+
    };
}

// ============================================================================
// Accounts
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub current: Option<Decimal>,
    pub available: Option<Decimal>,
    pub limit: Option<Decimal>,
    pub iso_currency_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAccount {
    pub account_id: String,
    pub name: String,
    pub official_name: Option<String>,
    pub mask: Option<String>,
    /// Provider account type (`depository`, `credit`, `loan`, `investment`, ...)
    pub account_type: String,
    pub subtype: Option<String>,
    pub balances: AccountBalances,
}

// ============================================================================
// Transactions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTransaction {
    pub transaction_id: String,
    pub account_id: String,
    /// Positive values are outflows, as reported by the provider.
    pub amount: Decimal,
    pub iso_currency_code: Option<String>,
    pub date: NaiveDate,
    pub name: String,
    pub merchant_name: Option<String>,
    pub category: Option<String>,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedTransaction {
    pub transaction_id: String,
    pub account_id: String,
}

/// Incremental transactions response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionsDelta {
    pub added: Vec<ProviderTransaction>,
    pub modified: Vec<ProviderTransaction>,
    pub removed: Vec<RemovedTransaction>,
    /// Cursor to send on the next incremental request.
    pub cursor: String,
}

// ============================================================================
// Investments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSecurity {
    pub security_id: String,
    pub name: Option<String>,
    pub ticker_symbol: Option<String>,
    pub security_type: Option<String>,
    pub close_price: Option<Decimal>,
    pub iso_currency_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHolding {
    pub account_id: String,
    pub security_id: String,
    pub quantity: Decimal,
    pub institution_price: Decimal,
    pub institution_value: Option<Decimal>,
    pub cost_basis: Option<Decimal>,
    pub iso_currency_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInvestmentTransaction {
    pub investment_transaction_id: String,
    pub account_id: String,
    pub security_id: Option<String>,
    pub date: NaiveDate,
    pub name: String,
    /// `buy`, `sell`, `cash`, `fee`, `transfer`, ...
    pub kind: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub amount: Decimal,
    pub fees: Option<Decimal>,
    pub iso_currency_code: Option<String>,
}

/// Full investments snapshot for an item. Securities are shared by every
/// account of the item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentsSnapshot {
    pub transactions: Vec<ProviderInvestmentTransaction>,
    pub holdings: Vec<ProviderHolding>,
    pub securities: Vec<ProviderSecurity>,
}

// ============================================================================
// Liabilities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLiability {
    pub account_id: String,
    pub is_overdue: Option<bool>,
    pub last_payment_amount: Option<Decimal>,
    pub last_statement_balance: Option<Decimal>,
    pub minimum_payment_amount: Option<Decimal>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub purchase_apr: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageLiability {
    pub account_id: String,
    pub loan_type_description: Option<String>,
    pub interest_rate_percentage: Option<Decimal>,
    pub origination_principal_amount: Option<Decimal>,
    pub next_monthly_payment: Option<Decimal>,
    pub maturity_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentLoanLiability {
    pub account_id: String,
    pub loan_name: Option<String>,
    pub interest_rate_percentage: Option<Decimal>,
    pub origination_principal_amount: Option<Decimal>,
    pub outstanding_interest_amount: Option<Decimal>,
    pub minimum_payment_amount: Option<Decimal>,
    pub expected_payoff_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiabilitiesSnapshot {
    pub credit: Vec<CreditLiability>,
    pub mortgage: Vec<MortgageLiability>,
    pub student: Vec<StudentLoanLiability>,
}

account_scoped!(
    ProviderTransaction,
    RemovedTransaction,
    ProviderHolding,
    ProviderInvestmentTransaction,
    CreditLiability,
    MortgageLiability,
    StudentLoanLiability,
);

// ============================================================================
// Provider trait
// ============================================================================

/// Aggregation provider client.
///
/// Implementations translate provider API failures into
/// [`BridgeError::ProviderApi`](crate::BridgeError::ProviderApi) and
/// connectivity problems into [`BridgeError::Transport`](crate::BridgeError::Transport).
/// The sync core treats the two differently.
#[async_trait]
pub trait AggregationProvider: Send + Sync {
    /// Exchange a one-time public token for a long-lived access credential.
    async fn exchange_public_token(&self, public_token: &str) -> Result<TokenExchange>;

    /// Fetch item metadata (product capabilities).
    async fn get_item(&self, access_token: &AccessToken) -> Result<ProviderItem>;

    /// Fetch every account linked under the item.
    async fn get_item_accounts(&self, item: &ItemHandle) -> Result<Vec<ProviderAccount>>;

    /// Fetch transaction changes since `item.cursor`.
    async fn get_item_transactions(&self, item: &ItemHandle) -> Result<TransactionsDelta>;

    /// Fetch the investments snapshot.
    async fn get_item_investments(&self, item: &ItemHandle) -> Result<InvestmentsSnapshot>;

    /// Fetch liability details.
    async fn get_item_liabilities(&self, item: &ItemHandle) -> Result<LiabilitiesSnapshot>;

    /// Revoke the access credential.
    async fn remove_item(&self, access_token: &AccessToken) -> Result<()>;
}
