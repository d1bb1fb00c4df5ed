//! Company value types.
//!
//! Pure values with structural equality: no identity, no lifecycle. They are
//! owned exclusively by the contact/location/state that embeds them and are
//! replaced wholesale on update, never mutated in place.

use serde::{Deserialize, Serialize};

use freightbook_core::ValueObject;

/// Company classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyType {
    Carrier,
    Broker,
    Shipper,
}

/// Kind of a single contact-info entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactInfoType {
    Phone,
    Fax,
    Email,
}

/// One labelled way of reaching a contact or location.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub label: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub info_type: Option<ContactInfoType>,
}

/// Postal address with optional phone/fax and coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    pub address_id: Option<i64>,
    pub address_name: Option<String>,
    pub street_address1: Option<String>,
    pub street_address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub address_phone: Option<String>,
    pub address_phone_extension: Option<String>,
    pub address_fax: Option<String>,
    pub address_fax_extension: Option<String>,
    pub address_latitude: Option<f64>,
    pub address_longitude: Option<f64>,
}

/// A person attached to a company.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contact {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_info: Option<Vec<ContactInfo>>,
    pub position: Option<String>,
    pub address: Option<Address>,
}

/// A physical site attached to a company.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub name: Option<String>,
    pub address: Option<Address>,
    pub contact_info: Option<Vec<ContactInfo>>,
}

impl ValueObject for ContactInfo {}
impl ValueObject for Address {}
impl ValueObject for Contact {}
impl ValueObject for Location {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_compare_structurally() {
        let a = Contact {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            ..Default::default()
        };
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn contact_info_type_serializes_under_type_key() {
        let info = ContactInfo {
            label: Some("dispatch".to_string()),
            value: Some("dispatch@acme.test".to_string()),
            info_type: Some(ContactInfoType::Email),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "email");

        let back: ContactInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn address_round_trips_with_coordinates() {
        let addr = Address {
            address_name: Some("HQ".to_string()),
            street_address1: Some("1 Main St".to_string()),
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            zip: Some("62701".to_string()),
            address_latitude: Some(39.8),
            address_longitude: Some(-89.65),
            ..Default::default()
        };
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
