//! Domain models for the ledger
//!
//! Items, accounts and the per-category records synced from the aggregation
//! provider.

use bridge_traits::account_sync::LinkedAccount;
use bridge_traits::provider::{AccessToken, ItemHandle, ProviderAccount};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::error::{LedgerError, Result};

// =============================================================================
// ID Types
// =============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_string(s: &str) -> Result<Self> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    LedgerError::invalid(stringify!($name), e.to_string())
                })
            }

            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a family
    FamilyId
);
uuid_id!(
    /// Unique identifier for a linked item
    ItemId
);
uuid_id!(
    /// Unique identifier for an account
    AccountId
);

// =============================================================================
// Products
// =============================================================================

/// Provider product that gates investment syncing.
pub const PRODUCT_INVESTMENTS: &str = "investments";
/// Provider product that gates liability syncing.
pub const PRODUCT_LIABILITIES: &str = "liabilities";

/// Set of provider product names, persisted as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductSet(BTreeSet<String>);

impl ProductSet {
    pub fn new<I, S>(products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(products.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, product: &str) -> bool {
        self.0.contains(product)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

// =============================================================================
// Family
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    pub created_at: i64,
}

impl Family {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FamilyId::new(),
            name: name.into(),
            created_at: Utc::now().timestamp(),
        }
    }
}

// =============================================================================
// Item
// =============================================================================

/// A linked provider credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub family_id: FamilyId,
    /// Provider's opaque item identifier
    pub provider_item_id: String,
    /// Display name (institution name, usually)
    pub name: String,
    pub access_token: AccessToken,
    /// Incremental transactions cursor; `None` until the first transactions
    /// scope commits
    pub next_cursor: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub available_products: ProductSet,
    pub billed_products: ProductSet,
    pub scheduled_for_deletion: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Item {
    /// Build a new, validated item.
    pub fn new(
        family_id: FamilyId,
        provider_item_id: impl Into<String>,
        name: impl Into<String>,
        access_token: AccessToken,
    ) -> Result<Self> {
        let now = Utc::now().timestamp();
        let item = Self {
            id: ItemId::new(),
            family_id,
            provider_item_id: provider_item_id.into(),
            name: name.into(),
            access_token,
            next_cursor: None,
            last_synced_at: None,
            available_products: ProductSet::default(),
            billed_products: ProductSet::default(),
            scheduled_for_deletion: false,
            created_at: now,
            updated_at: now,
        };
        item.validate()?;
        Ok(item)
    }

    /// Name and credential must be present.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::invalid("name", "can't be blank"));
        }
        if self.access_token.is_blank() {
            return Err(LedgerError::invalid("access_token", "can't be blank"));
        }
        if self.provider_item_id.trim().is_empty() {
            return Err(LedgerError::invalid("provider_item_id", "can't be blank"));
        }
        Ok(())
    }

    fn has_product(&self, product: &str) -> bool {
        self.available_products.contains(product) || self.billed_products.contains(product)
    }

    pub fn has_investment_accounts(&self) -> bool {
        self.has_product(PRODUCT_INVESTMENTS)
    }

    pub fn has_liability_accounts(&self) -> bool {
        self.has_product(PRODUCT_LIABILITIES)
    }

    /// Handle passed to item-scoped provider calls.
    pub fn handle(&self) -> ItemHandle {
        ItemHandle {
            item_id: self.provider_item_id.clone(),
            access_token: self.access_token.clone(),
            cursor: self.next_cursor.clone(),
        }
    }
}

// =============================================================================
// Account
// =============================================================================

/// A financial account reported under an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub item_id: ItemId,
    pub family_id: FamilyId,
    pub provider_account_id: String,
    pub name: String,
    pub official_name: Option<String>,
    pub mask: Option<String>,
    pub account_type: String,
    pub subtype: Option<String>,
    pub current_balance: Option<Decimal>,
    pub available_balance: Option<Decimal>,
    pub credit_limit: Option<Decimal>,
    pub currency: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Account {
    /// First sighting of a provider account under `item`.
    pub fn from_provider(item: &Item, data: &ProviderAccount) -> Self {
        let now = Utc::now().timestamp();
        let mut account = Self {
            id: AccountId::new(),
            item_id: item.id,
            family_id: item.family_id,
            provider_account_id: data.account_id.clone(),
            name: String::new(),
            official_name: None,
            mask: None,
            account_type: String::new(),
            subtype: None,
            current_balance: None,
            available_balance: None,
            credit_limit: None,
            currency: None,
            created_at: now,
            updated_at: now,
        };
        account.apply_snapshot(data, now);
        account
    }

    /// Overwrite the mutable snapshot fields with provider data.
    pub fn apply_snapshot(&mut self, data: &ProviderAccount, now: i64) {
        self.name = data.name.clone();
        self.official_name = data.official_name.clone();
        self.mask = data.mask.clone();
        self.account_type = data.account_type.clone();
        self.subtype = data.subtype.clone();
        self.current_balance = data.balances.current;
        self.available_balance = data.balances.available;
        self.credit_limit = data.balances.limit;
        self.currency = data.balances.iso_currency_code.clone();
        self.updated_at = now;
    }

    pub fn linked(&self) -> LinkedAccount {
        LinkedAccount {
            account_id: self.id.as_str(),
            item_id: self.item_id.as_str(),
            family_id: self.family_id.as_str(),
            provider_account_id: self.provider_account_id.clone(),
        }
    }
}

// =============================================================================
// Category records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: String,
    pub account_id: AccountId,
    pub provider_transaction_id: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub date: NaiveDate,
    pub name: String,
    pub merchant_name: Option<String>,
    pub category: Option<String>,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Security {
    pub id: String,
    pub provider_security_id: String,
    pub name: Option<String>,
    pub ticker_symbol: Option<String>,
    pub security_type: Option<String>,
    pub close_price: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holding {
    pub id: String,
    pub account_id: AccountId,
    pub security_id: String,
    pub quantity: Decimal,
    pub institution_price: Decimal,
    pub institution_value: Option<Decimal>,
    pub cost_basis: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentTransaction {
    pub id: String,
    pub account_id: AccountId,
    pub provider_investment_transaction_id: String,
    pub security_id: Option<String>,
    pub date: NaiveDate,
    pub name: String,
    pub kind: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub amount: Decimal,
    pub fees: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditDetail {
    pub account_id: AccountId,
    pub is_overdue: Option<bool>,
    pub last_payment_amount: Option<Decimal>,
    pub last_statement_balance: Option<Decimal>,
    pub minimum_payment_amount: Option<Decimal>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub purchase_apr: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MortgageDetail {
    pub account_id: AccountId,
    pub loan_type_description: Option<String>,
    pub interest_rate_percentage: Option<Decimal>,
    pub origination_principal_amount: Option<Decimal>,
    pub next_monthly_payment: Option<Decimal>,
    pub maturity_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentLoanDetail {
    pub account_id: AccountId,
    pub loan_name: Option<String>,
    pub interest_rate_percentage: Option<Decimal>,
    pub origination_principal_amount: Option<Decimal>,
    pub outstanding_interest_amount: Option<Decimal>,
    pub minimum_payment_amount: Option<Decimal>,
    pub expected_payoff_date: Option<NaiveDate>,
}

// =============================================================================
// Column helpers
// =============================================================================

pub(crate) fn decimal_to_text(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}

pub(crate) fn parse_decimal(value: &str) -> Result<Decimal> {
    value
        .parse::<Decimal>()
        .map_err(|e| LedgerError::Serialization(format!("invalid decimal {:?}: {}", value, e)))
}

pub(crate) fn parse_optional_decimal(value: Option<String>) -> Result<Option<Decimal>> {
    value.as_deref().map(parse_decimal).transpose()
}

pub(crate) fn timestamp_to_datetime(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::provider::AccountBalances;

    fn provider_account() -> ProviderAccount {
        ProviderAccount {
            account_id: "A1".to_string(),
            name: "Checking".to_string(),
            official_name: Some("Premier Checking".to_string()),
            mask: Some("0000".to_string()),
            account_type: "depository".to_string(),
            subtype: Some("checking".to_string()),
            balances: AccountBalances {
                current: Some(Decimal::new(12050, 2)),
                available: Some(Decimal::new(10000, 2)),
                limit: None,
                iso_currency_code: Some("USD".to_string()),
            },
        }
    }

    fn item() -> Item {
        Item::new(
            FamilyId::new(),
            "provider-item-1",
            "First Platypus Bank",
            AccessToken::new("access-sandbox-1"),
        )
        .unwrap()
    }

    #[test]
    fn test_item_requires_name_and_token() {
        let err = Item::new(FamilyId::new(), "p1", "  ", AccessToken::new("t")).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { ref field, .. } if field == "name"));

        let err = Item::new(FamilyId::new(), "p1", "Bank", AccessToken::new("")).unwrap_err();
        assert!(
            matches!(err, LedgerError::InvalidInput { ref field, .. } if field == "access_token")
        );
    }

    #[test]
    fn test_product_capabilities_check_available_and_billed() {
        let mut item = item();
        assert!(!item.has_investment_accounts());
        assert!(!item.has_liability_accounts());

        item.available_products = ProductSet::new(["liabilities"]);
        assert!(item.has_liability_accounts());
        assert!(!item.has_investment_accounts());

        item.available_products = ProductSet::default();
        item.billed_products = ProductSet::new(["transactions", "investments"]);
        assert!(item.has_investment_accounts());
    }

    #[test]
    fn test_product_set_json() {
        let set = ProductSet::new(["transactions", "auth"]);
        let json = set.to_json().unwrap();
        assert_eq!(json, r#"["auth","transactions"]"#);
        assert_eq!(ProductSet::from_json(&json).unwrap(), set);
        assert!(ProductSet::from_json("not json").is_err());
    }

    #[test]
    fn test_item_handle_carries_cursor() {
        let mut item = item();
        item.next_cursor = Some("c1".to_string());
        let handle = item.handle();
        assert_eq!(handle.item_id, "provider-item-1");
        assert_eq!(handle.cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn test_account_snapshot() {
        let item = item();
        let mut account = Account::from_provider(&item, &provider_account());
        assert_eq!(account.item_id, item.id);
        assert_eq!(account.family_id, item.family_id);
        assert_eq!(account.current_balance, Some(Decimal::new(12050, 2)));

        let mut updated = provider_account();
        updated.name = "Everyday Checking".to_string();
        updated.balances.current = Some(Decimal::new(99, 0));
        account.apply_snapshot(&updated, 42);

        assert_eq!(account.name, "Everyday Checking");
        assert_eq!(account.current_balance, Some(Decimal::new(99, 0)));
        assert_eq!(account.updated_at, 42);
    }

    #[test]
    fn test_decimal_helpers() {
        assert_eq!(parse_decimal("12.34").unwrap(), Decimal::new(1234, 2));
        assert!(parse_decimal("abc").is_err());
        assert_eq!(parse_optional_decimal(None).unwrap(), None);
        assert_eq!(decimal_to_text(Some(Decimal::new(5, 1))), Some("0.5".to_string()));
    }
}
