//! Generic editor form state and the client-side checks run before a body is built.

use validator::ValidateEmail;

use crate::model::EntityId;
use crate::relation::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Password,
    Number,
    MultiSelect(Collection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Ids(Vec<EntityId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: &'static str,
    pub label: &'static str,
    pub hint: &'static str,
    pub kind: FieldKind,
    pub value: FieldValue,
}

impl Field {
    pub fn text(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            hint: "",
            kind: FieldKind::Text,
            value: FieldValue::Text(String::new()),
        }
    }

    pub fn password(key: &'static str, label: &'static str) -> Self {
        Self {
            kind: FieldKind::Password,
            ..Self::text(key, label)
        }
    }

    pub fn number(key: &'static str, label: &'static str) -> Self {
        Self {
            kind: FieldKind::Number,
            ..Self::text(key, label)
        }
    }

    pub fn multi(key: &'static str, label: &'static str, collection: Collection) -> Self {
        Self {
            key,
            label,
            hint: "",
            kind: FieldKind::MultiSelect(collection),
            value: FieldValue::Ids(Vec::new()),
        }
    }

    pub fn hint(mut self, hint: &'static str) -> Self {
        self.hint = hint;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.value = FieldValue::Text(text.into());
        self
    }

    pub fn with_ids(mut self, ids: Vec<EntityId>) -> Self {
        self.value = FieldValue::Ids(ids);
        self
    }

    pub fn as_text(&self) -> &str {
        match &self.value {
            FieldValue::Text(text) => text,
            FieldValue::Ids(_) => "",
        }
    }

    pub fn as_ids(&self) -> &[EntityId] {
        match &self.value {
            FieldValue::Ids(ids) => ids,
            FieldValue::Text(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub fields: Vec<Field>,
    pub errors: Vec<FieldError>,
}

impl FormState {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            errors: Vec::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn field_mut(&mut self, key: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|field| field.key == key)
    }

    pub fn text(&self, key: &str) -> &str {
        self.field(key).map(Field::as_text).unwrap_or("")
    }

    pub fn ids(&self, key: &str) -> Vec<EntityId> {
        self.field(key)
            .map(|field| field.as_ids().to_vec())
            .unwrap_or_default()
    }

    pub fn set_text(&mut self, key: &str, text: impl Into<String>) {
        if let Some(field) = self.field_mut(key) {
            field.value = FieldValue::Text(text.into());
        }
    }

    pub fn set_ids(&mut self, key: &str, ids: Vec<EntityId>) {
        if let Some(field) = self.field_mut(key) {
            field.value = FieldValue::Ids(ids);
        }
    }

    /// Adds or removes `id`, keeping selection order.
    pub fn toggle_id(&mut self, key: &str, id: EntityId) {
        let Some(field) = self.field_mut(key) else {
            return;
        };
        if let FieldValue::Ids(ids) = &mut field.value {
            if let Some(pos) = ids.iter().position(|existing| *existing == id) {
                ids.remove(pos);
            } else {
                ids.push(id);
            }
        }
    }

    pub fn errors_for(&self, key: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|err| err.field == key)
            .map(|err| err.message.as_str())
            .collect()
    }
}

/// Collects field errors while reading validated values out of a form.
#[derive(Debug)]
pub struct Checks<'a> {
    form: &'a FormState,
    errors: Vec<FieldError>,
}

impl<'a> Checks<'a> {
    pub fn new(form: &'a FormState) -> Self {
        Self {
            form,
            errors: Vec::new(),
        }
    }

    pub fn fail(&mut self, key: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(key, message));
    }

    /// The raw value; blank values fail with `message`.
    pub fn required(&mut self, key: &str, message: &str) -> String {
        let value = self.form.text(key).to_string();
        if value.trim().is_empty() {
            self.fail(key, message);
        }
        value
    }

    pub fn optional(&self, key: &str) -> Option<String> {
        let value = self.form.text(key);
        if value.trim().is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Character-count bounds, checked only on non-blank values.
    pub fn length(&mut self, key: &str, value: &str, min: usize, max: usize, message: &str) {
        if value.trim().is_empty() {
            return;
        }
        let len = value.chars().count();
        if len < min || len > max {
            self.fail(key, message);
        }
    }

    pub fn email(&mut self, key: &str, value: &str, message: &str) {
        if !value.trim().is_empty() && !is_valid_email(value.trim()) {
            self.fail(key, message);
        }
    }

    /// A required whole number within `min..=max`.
    pub fn integer(
        &mut self,
        key: &str,
        min: i64,
        max: i64,
        missing: &str,
        invalid: &str,
    ) -> Option<i64> {
        let form = self.form;
        let raw = form.text(key).trim();
        if raw.is_empty() {
            self.fail(key, missing);
            return None;
        }
        match raw.parse::<i64>() {
            Ok(value) if (min..=max).contains(&value) => Some(value),
            _ => {
                self.fail(key, invalid);
                None
            }
        }
    }

    pub fn ids(&self, key: &str) -> Vec<EntityId> {
        self.form.ids(key)
    }

    pub fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

/// An RFC-shaped address whose domain has at least one dot.
pub fn is_valid_email(value: &str) -> bool {
    value.validate_email()
        && value
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.contains('.'))
}
