//! # Request Validation
//!
//! Every write endpoint funnels its payload through a [`FormRequest`]:
//! `authorize` decides whether the acting identity may submit it at all,
//! `rules` records field failures into a [`Validator`], and the collected
//! failures are rendered into localized messages for a 422 response.

use std::collections::BTreeMap;
use std::fmt::Display;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect, Value,
};
use uuid::Uuid;

use crate::auth::Identity;
use crate::commands::CommandRegistry;
use crate::error::{ApiError, forbidden, unauthorized, validation_error};
use crate::locale::Locale;

/// A single failed rule for a field, with template parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub field: String,
    pub rule: &'static str,
    pub params: Vec<(&'static str, String)>,
}

/// Collects rule failures for one request.
///
/// Most rules skip absent values; pair them with [`Validator::required`]
/// where presence matters. Once a field has failed, later rules for that
/// field are skipped so each field reports its first problem.
#[derive(Debug, Default)]
pub struct Validator {
    failures: Vec<Failure>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, rule: &'static str, params: Vec<(&'static str, String)>) {
        self.failures.push(Failure {
            field: field.to_string(),
            rule,
            params,
        });
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.failures.iter().any(|f| f.field == field)
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Fails when the string is missing or blank. Returns whether it was present.
    pub fn required(&mut self, field: &str, value: Option<&str>) -> bool {
        if present(value).is_some() {
            return true;
        }
        self.fail(field, "required", vec![]);
        false
    }

    /// Presence check for non-string values.
    pub fn required_value<T>(&mut self, field: &str, value: Option<&T>) -> bool {
        if value.is_some() {
            return true;
        }
        self.fail(field, "required", vec![]);
        false
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if self.has_error(field) {
            return;
        }
        if value.is_some_and(|v| v.chars().count() > max) {
            self.fail(field, "max", vec![("max", max.to_string())]);
        }
    }

    pub fn min_len(&mut self, field: &str, value: Option<&str>, min: usize) {
        if self.has_error(field) {
            return;
        }
        if value.is_some_and(|v| v.chars().count() < min) {
            self.fail(field, "min", vec![("min", min.to_string())]);
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if self.has_error(field) {
            return;
        }
        let Some(v) = present(value) else {
            return;
        };
        let valid = !v.chars().any(char::is_whitespace)
            && v.split_once('@').is_some_and(|(local, domain)| {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.contains('@')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            });
        if !valid {
            self.fail(field, "email", vec![]);
        }
    }

    pub fn matches(&mut self, field: &str, value: Option<&str>, pattern: &Regex) {
        if self.has_error(field) {
            return;
        }
        if present(value).is_some_and(|v| !pattern.is_match(v)) {
            self.fail(field, "regex", vec![]);
        }
    }

    pub fn one_of(&mut self, field: &str, value: Option<&str>, allowed: &[&str]) {
        if self.has_error(field) {
            return;
        }
        if present(value).is_some_and(|v| !allowed.contains(&v)) {
            self.fail(field, "in", vec![("values", allowed.join(", "))]);
        }
    }

    pub fn between<T: PartialOrd + Display>(&mut self, field: &str, value: Option<T>, min: T, max: T) {
        if self.has_error(field) {
            return;
        }
        if value.is_some_and(|v| v < min || v > max) {
            self.fail(
                field,
                "between",
                vec![("min", min.to_string()), ("max", max.to_string())],
            );
        }
    }

    pub fn min_value<T: PartialOrd + Display>(&mut self, field: &str, value: Option<T>, min: T) {
        if self.has_error(field) {
            return;
        }
        if value.is_some_and(|v| v < min) {
            self.fail(field, "min_value", vec![("min", min.to_string())]);
        }
    }

    /// `YYYY-MM-DD`
    pub fn date(&mut self, field: &str, value: Option<&str>) {
        if self.has_error(field) {
            return;
        }
        if present(value).is_some_and(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").is_err()) {
            self.fail(field, "date_format", vec![("format", "YYYY-MM-DD".to_string())]);
        }
    }

    /// Field is required when `other` is present.
    pub fn required_with(&mut self, field: &str, is_present: bool, other: &str, other_present: bool) {
        if other_present && !is_present && !self.has_error(field) {
            self.fail(field, "required_with", vec![("values", other.to_string())]);
        }
    }

    /// Field is required when `other` is absent.
    pub fn required_without(
        &mut self,
        field: &str,
        is_present: bool,
        other: &str,
        other_present: bool,
    ) {
        if !other_present && !is_present && !self.has_error(field) {
            self.fail(field, "required_without", vec![("values", other.to_string())]);
        }
    }

    /// Field is required when `other` currently holds `other_value`.
    pub fn required_if(
        &mut self,
        field: &str,
        is_present: bool,
        other: &str,
        other_value: &str,
        condition: bool,
    ) {
        if condition && !is_present && !self.has_error(field) {
            self.fail(
                field,
                "required_if",
                vec![("other", other.to_string()), ("value", other_value.to_string())],
            );
        }
    }

    /// Five-field CRON expression.
    pub fn cron(&mut self, field: &str, value: Option<&str>) {
        if self.has_error(field) {
            return;
        }
        if present(value).is_some_and(|v| !crate::cron::is_valid_expression(v)) {
            self.fail(field, "cron", vec![]);
        }
    }

    /// Fails unless `value` names a registered scheduled command.
    pub fn registered_command(&mut self, field: &str, value: Option<&str>, registry: &CommandRegistry) {
        if self.has_error(field) {
            return;
        }
        if present(value).is_some_and(|v| !registry.contains(v)) {
            self.fail(field, "command", vec![]);
        }
    }

    /// No other row of `E` may hold `value` in `column`.
    ///
    /// `ignore_id` excludes the row being updated; `scope` restricts the
    /// check to rows matching an extra column (e.g. the owner).
    pub async fn unique<E>(
        &mut self,
        db: &DatabaseConnection,
        field: &str,
        value: Option<&str>,
        column: E::Column,
        ignore_id: Option<(E::Column, Uuid)>,
        scope: Option<(E::Column, Value)>,
    ) -> Result<(), DbErr>
    where
        E: EntityTrait,
    {
        if self.has_error(field) {
            return Ok(());
        }
        let Some(value) = present(value) else {
            return Ok(());
        };

        let mut query = E::find().filter(column.eq(value));
        if let Some((id_column, id)) = ignore_id {
            query = query.filter(id_column.ne(id));
        }
        if let Some((scope_column, scope_value)) = scope {
            query = query.filter(scope_column.eq(scope_value));
        }

        if query.limit(1).one(db).await?.is_some() {
            self.fail(field, "unique", vec![]);
        }
        Ok(())
    }

    /// A row of `E` must hold `value` in `column`.
    pub async fn exists<E, V>(
        &mut self,
        db: &DatabaseConnection,
        field: &str,
        column: E::Column,
        value: Option<V>,
        scope: Option<(E::Column, Value)>,
    ) -> Result<(), DbErr>
    where
        E: EntityTrait,
        V: Into<Value>,
    {
        if self.has_error(field) {
            return Ok(());
        }
        let Some(value) = value else {
            return Ok(());
        };

        let mut query = E::find().filter(column.eq(value));
        if let Some((scope_column, scope_value)) = scope {
            query = query.filter(scope_column.eq(scope_value));
        }

        if query.limit(1).one(db).await?.is_none() {
            self.fail(field, "exists", vec![]);
        }
        Ok(())
    }

    /// Every id in `ids` must exist in `column` (optionally within `scope`).
    pub async fn exists_all<E>(
        &mut self,
        db: &DatabaseConnection,
        field: &str,
        column: E::Column,
        ids: Option<&[Uuid]>,
        scope: Option<(E::Column, Value)>,
    ) -> Result<(), DbErr>
    where
        E: EntityTrait,
    {
        if self.has_error(field) {
            return Ok(());
        }
        let Some(ids) = ids.filter(|ids| !ids.is_empty()) else {
            return Ok(());
        };

        let mut query = E::find().filter(column.is_in(ids.iter().copied()));
        if let Some((scope_column, scope_value)) = scope {
            query = query.filter(scope_column.eq(scope_value));
        }

        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        if query.all(db).await?.len() != unique.len() {
            self.fail(field, "exists", vec![]);
        }
        Ok(())
    }

    /// Referenced row must exist and, when `owner` is given, belong to it.
    pub async fn owned<E>(
        &mut self,
        db: &DatabaseConnection,
        field: &str,
        id_column: E::Column,
        id: Option<Uuid>,
        owner_column: E::Column,
        owner: Option<Uuid>,
    ) -> Result<(), DbErr>
    where
        E: EntityTrait,
    {
        if self.has_error(field) {
            return Ok(());
        }
        let Some(id) = id else {
            return Ok(());
        };

        if E::find().filter(id_column.eq(id)).limit(1).one(db).await?.is_none() {
            self.fail(field, "exists", vec![]);
            return Ok(());
        }

        if let Some(owner) = owner {
            let belongs = E::find()
                .filter(id_column.eq(id))
                .filter(owner_column.eq(owner))
                .limit(1)
                .one(db)
                .await?
                .is_some();
            if !belongs {
                self.fail(field, "owned", vec![]);
            }
        }
        Ok(())
    }

    /// Render failures as `{ field: [message, ...] }`.
    ///
    /// Custom messages are keyed `field.rule` (or just `rule`) and win over
    /// the locale's template. `:attribute`, and the `:values`/`:other`
    /// parameters when they name fields, use localized display names.
    pub fn render(
        &self,
        locale: Locale,
        attributes: &[(&str, &str)],
        messages: &[(&str, &str)],
    ) -> BTreeMap<String, Vec<String>> {
        let display = |field: &str| -> String {
            attributes
                .iter()
                .find(|(k, _)| *k == field)
                .map(|(_, v)| v.to_string())
                .or_else(|| locale.attribute(field).map(str::to_string))
                .unwrap_or_else(|| field.replace('_', " "))
        };

        let mut rendered: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for failure in &self.failures {
            let specific = format!("{}.{}", failure.field, failure.rule);
            let template = messages
                .iter()
                .find(|(k, _)| *k == specific)
                .or_else(|| messages.iter().find(|(k, _)| *k == failure.rule))
                .map(|(_, v)| *v)
                .unwrap_or_else(|| locale.message(failure.rule));

            let mut message = template.replace(":attribute", &display(&failure.field));
            for (key, value) in &failure.params {
                let value = match (*key, failure.rule) {
                    ("values", "required_with" | "required_without") | ("other", _) => {
                        display(value)
                    }
                    _ => value.clone(),
                };
                message = message.replace(&format!(":{key}"), &value);
            }

            rendered
                .entry(failure.field.clone())
                .or_default()
                .push(message);
        }
        rendered
    }
}

/// What a request's rules may consult besides its own fields.
pub struct RequestContext<'a> {
    pub db: &'a DatabaseConnection,
    /// `None` for guest endpoints such as registration
    pub identity: Option<&'a Identity>,
    /// Row being updated, excluded from uniqueness checks
    pub record_id: Option<Uuid>,
    /// Owner the row will belong to, scoping per-owner uniqueness and references
    pub owner_id: Option<Uuid>,
    pub commands: &'a CommandRegistry,
}

impl RequestContext<'_> {
    pub fn is_admin(&self) -> bool {
        self.identity.is_some_and(Identity::is_admin)
    }

    pub fn is_update(&self) -> bool {
        self.record_id.is_some()
    }
}

/// A validated, authorized request payload.
#[async_trait]
pub trait FormRequest: Send + Sync {
    /// Permission required under the acting guard.
    const PERMISSION: &'static str;

    fn authorize(&self, identity: Option<&Identity>) -> bool {
        identity.is_some_and(|identity| identity.can(Self::PERMISSION))
    }

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr>;

    /// Display-name overrides for fields.
    fn attributes(&self, _locale: Locale) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    /// Message overrides keyed `field.rule` or `rule`.
    fn messages(&self, _locale: Locale) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }
}

/// Authorize then validate `request`, mapping failures to 401/403/422.
pub async fn validate<R: FormRequest>(
    request: &R,
    ctx: &RequestContext<'_>,
    locale: Locale,
) -> Result<(), ApiError> {
    if !request.authorize(ctx.identity) {
        return Err(match ctx.identity {
            Some(_) => forbidden(Some("Insufficient permissions")),
            None => unauthorized(None),
        });
    }

    let mut v = Validator::new();
    request.rules(ctx, &mut v).await?;

    if v.is_valid() {
        return Ok(());
    }

    let details = v.render(locale, &request.attributes(locale), &request.messages(locale));
    tracing::debug!(fields = ?details.keys().collect::<Vec<_>>(), "request validation failed");

    Err(validation_error(
        locale.invalid_data(),
        serde_json::to_value(details).unwrap_or_default(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank_strings() {
        let mut v = Validator::new();
        assert!(!v.required("name", Some("   ")));
        assert!(!v.required("city", None));
        assert!(v.required("zip", Some("11000")));

        let fields: Vec<_> = v.failures().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "city"]);
    }

    #[test]
    fn first_failure_per_field_wins() {
        let mut v = Validator::new();
        v.required("code", None);
        v.max_len("code", None, 4);
        v.one_of("code", Some("x"), &["a"]);

        assert_eq!(v.failures().len(), 1);
        assert_eq!(v.failures()[0].rule, "required");
    }

    #[test]
    fn email_rule() {
        let mut v = Validator::new();
        v.email("a", Some("jana@example.cz"));
        v.email("b", Some("jana@localhost"));
        v.email("c", Some("jana example@x.cz"));
        v.email("d", Some("@example.cz"));

        let fields: Vec<_> = v.failures().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["b", "c", "d"]);
    }

    #[test]
    fn conditional_requirements() {
        let mut v = Validator::new();
        v.required_with("bank_code", false, "account_number", true);
        v.required_with("swift", false, "iban", false);
        v.required_without("client_name", false, "client_id", false);
        v.required_if("custom_expression", false, "frequency", "custom", true);

        let fields: Vec<_> = v.failures().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["bank_code", "client_name", "custom_expression"]);
    }

    #[test]
    fn numeric_and_date_rules() {
        let mut v = Validator::new();
        v.between("rate", Some(101), 0, 100);
        v.between("due_in", Some(30), 0, 365);
        v.min_value("amount", Some(0i64), 1);
        v.date("issued_on", Some("2024-02-30"));
        v.date("spent_on", Some("2024-02-29"));

        let fields: Vec<_> = v.failures().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["rate", "amount", "issued_on"]);
    }

    #[test]
    fn renders_localized_messages_with_attribute_names() {
        let mut v = Validator::new();
        v.required_with("bank_code", false, "account_number", true);
        v.max_len("name", Some("abcdef"), 3);

        let cs = v.render(Locale::Cs, &[], &[]);
        assert_eq!(
            cs["bank_code"],
            vec!["Pole kód banky je povinné, pokud je vyplněno číslo účtu."]
        );
        assert_eq!(cs["name"], vec!["Pole název nesmí být delší než 3 znaků."]);

        let sk = v.render(Locale::Sk, &[], &[]);
        assert_eq!(
            sk["bank_code"],
            vec!["Pole kód banky je povinné, ak je vyplnené číslo účtu."]
        );

        let en = v.render(Locale::En, &[], &[]);
        assert_eq!(
            en["bank_code"],
            vec!["The bank code field is required when account number is present."]
        );
    }

    #[test]
    fn custom_messages_and_attributes_take_precedence() {
        let mut v = Validator::new();
        v.cron("custom_expression", Some("every day"));
        v.required("name", None);

        let rendered = v.render(
            Locale::En,
            &[("name", "task name")],
            &[("custom_expression.cron", "Bad :attribute.")],
        );

        assert_eq!(rendered["custom_expression"], vec!["Bad custom expression."]);
        assert_eq!(rendered["name"], vec!["The task name field is required."]);
    }
}
