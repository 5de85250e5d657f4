//! # Localization
//!
//! Czech and Slovak translation tables (with an English fallback) for
//! validation messages and attribute display names.

use std::{convert::Infallible, fmt, str::FromStr};

use axum::{extract::FromRequestParts, http::header::ACCEPT_LANGUAGE, http::request::Parts};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Identity;
use crate::server::AppState;

/// Supported interface languages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Cs,
    Sk,
    En,
}

/// Returned when a locale tag is not one of `cs`, `sk`, `en`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale '{0}'")]
pub struct UnsupportedLocale(pub String);

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Cs, Locale::Sk, Locale::En];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Cs => "cs",
            Locale::Sk => "sk",
            Locale::En => "en",
        }
    }

    /// Picks the supported language with the highest `q` weight from an
    /// `Accept-Language` value. Ties go to the one listed first; `q=0`
    /// excludes a language.
    pub fn from_accept_language(header: &str) -> Option<Locale> {
        let mut best: Option<(Locale, f32)> = None;

        for entry in header.split(',') {
            let mut parts = entry.split(';');
            let Some(tag) = parts.next().map(str::trim) else {
                continue;
            };
            let Some(Ok(locale)) = tag.split(['-', '_']).next().map(str::parse::<Locale>) else {
                continue;
            };

            let quality = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .map_or(Some(1.0), |q| q.trim().parse::<f32>().ok());
            let Some(quality) = quality.filter(|q| *q > 0.0) else {
                continue;
            };

            if best.is_none_or(|(_, current)| quality > current) {
                best = Some((locale, quality));
            }
        }

        best.map(|(locale, _)| locale)
    }

    /// Message template for a validation rule key.
    pub fn message(self, rule: &str) -> &'static str {
        let table = match self {
            Locale::Cs => CS_MESSAGES,
            Locale::Sk => SK_MESSAGES,
            Locale::En => EN_MESSAGES,
        };
        lookup(table, rule)
            .or_else(|| lookup(EN_MESSAGES, rule))
            .unwrap_or("The :attribute field is invalid.")
    }

    /// Summary message of a 422 response.
    pub fn invalid_data(self) -> &'static str {
        match self {
            Locale::Cs => "Zadaná data nejsou platná.",
            Locale::Sk => "Zadané údaje nie sú platné.",
            Locale::En => "The given data was invalid.",
        }
    }

    /// Localized display name of a request field, when one is known.
    pub fn attribute(self, field: &str) -> Option<&'static str> {
        let table = match self {
            Locale::Cs => CS_ATTRIBUTES,
            Locale::Sk => SK_ATTRIBUTES,
            Locale::En => return None,
        };
        lookup(table, field)
    }
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cs" | "cz" => Ok(Locale::Cs),
            "sk" => Ok(Locale::Sk),
            "en" => Ok(Locale::En),
            other => Err(UnsupportedLocale(other.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the request locale: `Accept-Language`, then the signed-in
/// user's stored preference, then the configured default.
impl FromRequestParts<AppState> for Locale {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(Locale::from_accept_language);

        if let Some(locale) = from_header {
            return Ok(locale);
        }

        let from_user = parts
            .extensions
            .get::<Identity>()
            .and_then(|identity| identity.user.locale.parse().ok());

        Ok(from_user.unwrap_or_else(|| state.config.locale()))
    }
}

const CS_MESSAGES: &[(&str, &str)] = &[
    ("required", "Pole :attribute je povinné."),
    ("max", "Pole :attribute nesmí být delší než :max znaků."),
    ("min", "Pole :attribute musí obsahovat alespoň :min znaků."),
    ("between", "Hodnota :attribute musí být mezi :min a :max."),
    ("min_value", "Hodnota :attribute musí být alespoň :min."),
    ("email", "Pole :attribute musí být platná e-mailová adresa."),
    ("regex", "Formát pole :attribute je neplatný."),
    ("in", "Zvolená hodnota pro :attribute je neplatná."),
    ("unique", "Hodnota pole :attribute již existuje."),
    ("exists", "Zvolená hodnota pro :attribute neexistuje."),
    ("required_with", "Pole :attribute je povinné, pokud je vyplněno :values."),
    ("required_without", "Pole :attribute je povinné, pokud není vyplněno :values."),
    ("required_if", "Pole :attribute je povinné, když je :other :value."),
    ("date_format", "Pole :attribute musí odpovídat formátu :format."),
    ("cron", "Pole :attribute musí být platný CRON výraz se pěti poli."),
    ("command", "Příkaz :attribute není registrován."),
    ("owned", "Zvolená hodnota pro :attribute nepatří vašemu účtu."),
];

const SK_MESSAGES: &[(&str, &str)] = &[
    ("required", "Pole :attribute je povinné."),
    ("max", "Pole :attribute nesmie byť dlhšie ako :max znakov."),
    ("min", "Pole :attribute musí obsahovať aspoň :min znakov."),
    ("between", "Hodnota :attribute musí byť medzi :min a :max."),
    ("min_value", "Hodnota :attribute musí byť aspoň :min."),
    ("email", "Pole :attribute musí byť platná e-mailová adresa."),
    ("regex", "Formát poľa :attribute je neplatný."),
    ("in", "Zvolená hodnota pre :attribute je neplatná."),
    ("unique", "Hodnota poľa :attribute už existuje."),
    ("exists", "Zvolená hodnota pre :attribute neexistuje."),
    ("required_with", "Pole :attribute je povinné, ak je vyplnené :values."),
    ("required_without", "Pole :attribute je povinné, ak nie je vyplnené :values."),
    ("required_if", "Pole :attribute je povinné, keď je :other :value."),
    ("date_format", "Pole :attribute musí zodpovedať formátu :format."),
    ("cron", "Pole :attribute musí byť platný CRON výraz s piatimi poľami."),
    ("command", "Príkaz :attribute nie je registrovaný."),
    ("owned", "Zvolená hodnota pre :attribute nepatrí vášmu účtu."),
];

const EN_MESSAGES: &[(&str, &str)] = &[
    ("required", "The :attribute field is required."),
    ("max", "The :attribute may not be greater than :max characters."),
    ("min", "The :attribute must be at least :min characters."),
    ("between", "The :attribute must be between :min and :max."),
    ("min_value", "The :attribute must be at least :min."),
    ("email", "The :attribute must be a valid email address."),
    ("regex", "The :attribute format is invalid."),
    ("in", "The selected :attribute is invalid."),
    ("unique", "The :attribute has already been taken."),
    ("exists", "The selected :attribute does not exist."),
    ("required_with", "The :attribute field is required when :values is present."),
    ("required_without", "The :attribute field is required when :values is not present."),
    ("required_if", "The :attribute field is required when :other is :value."),
    ("date_format", "The :attribute does not match the format :format."),
    ("cron", "The :attribute must be a valid five-field CRON expression."),
    ("command", "The :attribute is not a registered command."),
    ("owned", "The selected :attribute does not belong to your account."),
];

const CS_ATTRIBUTES: &[(&str, &str)] = &[
    ("name", "název"),
    ("email", "e-mail"),
    ("password", "heslo"),
    ("locale", "jazyk"),
    ("street", "ulice"),
    ("city", "město"),
    ("zip", "PSČ"),
    ("country", "země"),
    ("company_id", "IČO"),
    ("vat_id", "DIČ"),
    ("phone", "telefon"),
    ("account_number", "číslo účtu"),
    ("bank_code", "kód banky"),
    ("iban", "IBAN"),
    ("swift", "SWIFT"),
    ("code", "kód"),
    ("number", "číslo faktury"),
    ("client_id", "odběratel"),
    ("client_name", "název odběratele"),
    ("client_address", "adresa odběratele"),
    ("supplier_id", "dodavatel"),
    ("supplier_name", "název dodavatele"),
    ("supplier_address", "adresa dodavatele"),
    ("payment_method_id", "způsob platby"),
    ("amount", "částka"),
    ("currency", "měna"),
    ("issued_on", "datum vystavení"),
    ("due_in", "splatnost"),
    ("status", "stav"),
    ("note", "poznámka"),
    ("sku", "katalogové číslo"),
    ("unit", "jednotka"),
    ("price", "cena"),
    ("tax_id", "sazba DPH"),
    ("rate", "sazba"),
    ("description", "popis"),
    ("spent_on", "datum výdaje"),
    ("base_command", "příkaz"),
    ("command_params", "parametry příkazu"),
    ("frequency", "frekvence"),
    ("custom_expression", "vlastní výraz"),
    ("run_at", "čas spuštění"),
    ("day_of_week", "den v týdnu"),
    ("day_of_month", "den v měsíci"),
    ("guard_name", "guard"),
    ("permissions", "oprávnění"),
    ("roles", "role"),
    ("user_id", "uživatel"),
];

const SK_ATTRIBUTES: &[(&str, &str)] = &[
    ("name", "názov"),
    ("email", "e-mail"),
    ("password", "heslo"),
    ("locale", "jazyk"),
    ("street", "ulica"),
    ("city", "mesto"),
    ("zip", "PSČ"),
    ("country", "krajina"),
    ("company_id", "IČO"),
    ("vat_id", "DIČ"),
    ("phone", "telefón"),
    ("account_number", "číslo účtu"),
    ("bank_code", "kód banky"),
    ("iban", "IBAN"),
    ("swift", "SWIFT"),
    ("code", "kód"),
    ("number", "číslo faktúry"),
    ("client_id", "odberateľ"),
    ("client_name", "názov odberateľa"),
    ("client_address", "adresa odberateľa"),
    ("supplier_id", "dodávateľ"),
    ("supplier_name", "názov dodávateľa"),
    ("supplier_address", "adresa dodávateľa"),
    ("payment_method_id", "spôsob platby"),
    ("amount", "suma"),
    ("currency", "mena"),
    ("issued_on", "dátum vystavenia"),
    ("due_in", "splatnosť"),
    ("status", "stav"),
    ("note", "poznámka"),
    ("sku", "katalógové číslo"),
    ("unit", "jednotka"),
    ("price", "cena"),
    ("tax_id", "sadzba DPH"),
    ("rate", "sadzba"),
    ("description", "popis"),
    ("spent_on", "dátum výdavku"),
    ("base_command", "príkaz"),
    ("command_params", "parametre príkazu"),
    ("frequency", "frekvencia"),
    ("custom_expression", "vlastný výraz"),
    ("run_at", "čas spustenia"),
    ("day_of_week", "deň v týždni"),
    ("day_of_month", "deň v mesiaci"),
    ("guard_name", "guard"),
    ("permissions", "oprávnenia"),
    ("roles", "roly"),
    ("user_id", "používateľ"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accept_language_preference() {
        assert_eq!(
            Locale::from_accept_language("sk-SK,sk;q=0.9,en;q=0.8"),
            Some(Locale::Sk)
        );
        assert_eq!(
            Locale::from_accept_language("de-DE, en-US;q=0.7"),
            Some(Locale::En)
        );
        assert_eq!(Locale::from_accept_language("de, fr"), None);
    }

    #[test]
    fn accept_language_honours_quality_weights() {
        assert_eq!(
            Locale::from_accept_language("en;q=0.1, cs;q=0.9"),
            Some(Locale::Cs)
        );
        assert_eq!(
            Locale::from_accept_language("sk;q=0.5, en;q=0.5"),
            Some(Locale::Sk)
        );
        assert_eq!(Locale::from_accept_language("cs;q=0, en;q=0.2"), Some(Locale::En));
        assert_eq!(Locale::from_accept_language("cs;q=0"), None);
    }

    #[test]
    fn every_locale_covers_every_rule() {
        for (rule, _) in EN_MESSAGES {
            assert!(lookup(CS_MESSAGES, rule).is_some(), "cs missing {rule}");
            assert!(lookup(SK_MESSAGES, rule).is_some(), "sk missing {rule}");
        }
        assert_eq!(CS_ATTRIBUTES.len(), SK_ATTRIBUTES.len());
    }

    #[test]
    fn english_has_no_attribute_overrides() {
        assert_eq!(Locale::En.attribute("bank_code"), None);
        assert_eq!(Locale::Cs.attribute("bank_code"), Some("kód banky"));
    }

    #[test]
    fn unknown_rule_falls_back() {
        assert_eq!(Locale::Sk.message("nope"), "The :attribute field is invalid.");
    }
}
