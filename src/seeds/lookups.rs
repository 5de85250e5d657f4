//! Lookup seeding
//!
//! Fills empty tax and payment-method tables with the usual Czech rates
//! and methods. Tables that already hold rows are left alone.

use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

use crate::models::{payment_method, tax};
use crate::repositories::{PaymentMethodRepository, TaxRepository};
use crate::requests::{PaymentMethodRequest, TaxRequest};

const TAXES: [(&str, i32, bool); 3] = [
    ("Základní sazba", 21, true),
    ("Snížená sazba", 12, false),
    ("Osvobozeno", 0, false),
];

const PAYMENT_METHODS: [(&str, &str); 3] = [
    ("Bankovní převod", "bank_transfer"),
    ("Hotovost", "cash"),
    ("Platební karta", "card"),
];

/// Seeds default taxes and payment methods into empty tables
pub async fn seed_lookups(db: &DatabaseConnection) -> Result<()> {
    if tax::Entity::find().count(db).await? == 0 {
        let repo = TaxRepository::new(db);
        for (name, rate, is_default) in TAXES {
            log::info!("Creating tax rate: {} ({}%)", name, rate);
            repo.save(
                None,
                &TaxRequest {
                    name: Some(name.to_string()),
                    rate: Some(rate),
                    is_default: Some(is_default),
                },
            )
            .await?;
        }
    } else {
        log::info!("Tax rates already present, skipping");
    }

    if payment_method::Entity::find().count(db).await? == 0 {
        let repo = PaymentMethodRepository::new(db);
        for (name, code) in PAYMENT_METHODS {
            log::info!("Creating payment method: {}", code);
            repo.create(&PaymentMethodRequest {
                name: Some(name.to_string()),
                code: Some(code.to_string()),
            })
            .await?;
        }
    } else {
        log::info!("Payment methods already present, skipping");
    }

    Ok(())
}
