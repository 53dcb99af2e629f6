//! Shipping and payment details captured at checkout.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    #[default]
    Delivery,
    Pickup,
}

impl ShippingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMethod::Delivery => "delivery",
            ShippingMethod::Pickup => "pickup",
        }
    }
}

impl std::str::FromStr for ShippingMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(ShippingMethod::Delivery),
            "pickup" => Ok(ShippingMethod::Pickup),
            other => Err(DomainError::UnknownValue {
                kind: "shipping method",
                value: other.to_string(),
            }),
        }
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            other => Err(DomainError::UnknownValue {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

/// Destination of an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub method: ShippingMethod,
    pub address: Option<String>,
    pub pickup_point: Option<String>,
}

impl ShippingInfo {
    /// Home delivery to `address`.
    pub fn delivery(address: impl Into<String>) -> Self {
        Self {
            method: ShippingMethod::Delivery,
            address: Some(address.into()),
            pickup_point: None,
        }
    }

    /// Collection from `pickup_point`.
    pub fn pickup(pickup_point: impl Into<String>) -> Self {
        Self {
            method: ShippingMethod::Pickup,
            address: None,
            pickup_point: Some(pickup_point.into()),
        }
    }

    /// Delivery needs an address; pickup needs a pickup point.
    pub fn validate(&self) -> Result<(), DomainError> {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        match self.method {
            ShippingMethod::Delivery if !present(&self.address) => {
                Err(DomainError::MissingShippingAddress)
            }
            ShippingMethod::Pickup if !present(&self.pickup_point) => {
                Err(DomainError::MissingPickupPoint)
            }
            _ => Ok(()),
        }
    }
}
