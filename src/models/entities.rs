//! Reference data the front end loads once per page.

use alloc::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Bank, Category, UserId};

/// Account details of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    /// User identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// E-mail address.
    pub email: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
}

/// Entities owned by the signed-in user (`GET /api/user/entities`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntities {
    /// Account details.
    pub user_details: UserDetails,
    /// Currency every amount is converted into.
    pub main_currency: String,
    /// Statement currencies present among the user's transactions.
    #[serde(default)]
    pub base_currencies: Vec<String>,
    /// Banks the user has transactions from, keyed by name.
    #[serde(default)]
    pub banks: BTreeMap<String, Bank>,
    /// The user's categories, keyed by name.
    #[serde(default)]
    pub categories: BTreeMap<String, Category>,
}

/// Application-wide reference data (`GET /api/entities`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntities {
    /// Currencies the server can convert between.
    #[serde(default)]
    pub currencies: Vec<String>,
    /// Every bank statements can be imported from, keyed by name.
    #[serde(default)]
    pub banks: BTreeMap<String, Bank>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BankId, CategoryId};

    #[test]
    fn deserialize_user_entities() {
        let json = r#"{
            "user_details": {
                "id": 1,
                "username": "jdoe",
                "email": "jdoe@example.com",
                "first_name": "John",
                "last_name": "Doe"
            },
            "main_currency": "CZK",
            "base_currencies": ["CZK", "EUR"],
            "banks": {"Revolut": {"id": 1, "name": "Revolut"}},
            "categories": {
                "Food": {"id": 3, "name": "Food"},
                "Salary": {"id": 4, "name": "Salary"}
            }
        }"#;
        let entities: UserEntities = serde_json::from_str(json).unwrap();
        assert_eq!(entities.user_details.id, UserId::new(1));
        assert_eq!(entities.main_currency, "CZK");
        assert_eq!(entities.banks["Revolut"].id, BankId::new(1));
        assert_eq!(entities.categories["Salary"].id, CategoryId::new(4));
    }

    #[test]
    fn user_entities_tolerate_missing_collections() {
        let json = r#"{
            "user_details": {"id": 2, "username": "new", "email": "n@example.com",
                             "first_name": null, "last_name": null},
            "main_currency": "EUR"
        }"#;
        let entities: UserEntities = serde_json::from_str(json).unwrap();
        assert!(entities.categories.is_empty());
        assert!(entities.base_currencies.is_empty());
    }

    #[test]
    fn deserialize_session_entities() {
        let json = r#"{
            "currencies": ["USD", "EUR", "CZK"],
            "banks": {
                "Revolut": {"id": 1, "name": "Revolut"},
                "Equabank": {"id": 2, "name": "Equabank"}
            }
        }"#;
        let entities: SessionEntities = serde_json::from_str(json).unwrap();
        assert_eq!(entities.currencies.len(), 3);
        assert_eq!(entities.banks.len(), 2);
    }
}
