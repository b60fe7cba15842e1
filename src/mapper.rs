use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Date,
    Description,
    Amount,
    Debit,
    Credit,
    Balance,
    Category,
    Reference,
}

impl CanonicalField {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "date" => Some(Self::Date),
            "description" => Some(Self::Description),
            "amount" => Some(Self::Amount),
            "debit" => Some(Self::Debit),
            "credit" => Some(Self::Credit),
            "balance" => Some(Self::Balance),
            "category" => Some(Self::Category),
            "reference" => Some(Self::Reference),
            _ => None,
        }
    }
}

/// Raw column index per canonical field; at most one column per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    pub date: Option<usize>,
    pub description: Option<usize>,
    pub amount: Option<usize>,
    pub debit: Option<usize>,
    pub credit: Option<usize>,
    pub balance: Option<usize>,
    pub category: Option<usize>,
    pub reference: Option<usize>,
}

impl ColumnMapping {
    fn slot(&mut self, field: CanonicalField) -> &mut Option<usize> {
        match field {
            CanonicalField::Date => &mut self.date,
            CanonicalField::Description => &mut self.description,
            CanonicalField::Amount => &mut self.amount,
            CanonicalField::Debit => &mut self.debit,
            CanonicalField::Credit => &mut self.credit,
            CanonicalField::Balance => &mut self.balance,
            CanonicalField::Category => &mut self.category,
            CanonicalField::Reference => &mut self.reference,
        }
    }

    /// Manual override: replaces whatever auto-detection claimed.
    pub fn set(&mut self, field: CanonicalField, index: usize) {
        *self.slot(field) = Some(index);
    }

    /// Warnings for fields the downstream builder needs. Not an error:
    /// affected rows are dropped with per-row reasons instead.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.date.is_none() {
            out.push("no date column detected; all rows will be skipped".to_string());
        }
        if self.amount.is_none() && self.debit.is_none() && self.credit.is_none() {
            out.push(
                "no amount or debit/credit column detected; all rows will be skipped".to_string(),
            );
        }
        out
    }
}

/// Per-field header keywords, lower-case. Defaults cover the English and
/// Spanish exports this tool grew up around; `keywords.json` in the data
/// directory extends them per install, so new locales are additive.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldKeywords {
    pub date: Vec<String>,
    pub description: Vec<String>,
    pub amount: Vec<String>,
    pub debit: Vec<String>,
    pub credit: Vec<String>,
    pub balance: Vec<String>,
    pub category: Vec<String>,
    pub reference: Vec<String>,
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for FieldKeywords {
    fn default() -> Self {
        Self {
            date: strings(&["date", "fecha", "booking date", "value date"]),
            description: strings(&["description", "concept", "concepto", "detail", "detalle"]),
            amount: strings(&["amount", "importe", "monto"]),
            debit: strings(&["debit", "cargo", "withdrawal", "debe"]),
            credit: strings(&["credit", "abono", "deposit", "haber"]),
            balance: strings(&["balance", "saldo"]),
            category: strings(&["category", "categoria", "categor\u{ed}a"]),
            reference: strings(&["reference", "referencia", "ref."]),
        }
    }
}

impl FieldKeywords {
    /// Merge overrides from `keywords.json` on top of the defaults. A field
    /// present in the file extends (not replaces) the built-in list.
    pub fn load(path: &Path) -> Self {
        let mut base = Self::default();
        let Ok(content) = std::fs::read_to_string(path) else {
            return base;
        };
        let Ok(extra) = serde_json::from_str::<FieldKeywords>(&content) else {
            return base;
        };
        for (dst, src) in [
            (&mut base.date, extra.date),
            (&mut base.description, extra.description),
            (&mut base.amount, extra.amount),
            (&mut base.debit, extra.debit),
            (&mut base.credit, extra.credit),
            (&mut base.balance, extra.balance),
            (&mut base.category, extra.category),
            (&mut base.reference, extra.reference),
        ] {
            for word in src {
                let word = word.to_lowercase();
                if !dst.contains(&word) {
                    dst.push(word);
                }
            }
        }
        base
    }

    /// `amount` headers must match exactly so "Amount" never shadows a bank's
    /// "Amount Debit"/"Amount Credit" split pair; everything else matches by
    /// substring.
    fn matches(&self, field: CanonicalField, header: &str) -> bool {
        let words = match field {
            CanonicalField::Date => &self.date,
            CanonicalField::Description => &self.description,
            CanonicalField::Amount => &self.amount,
            CanonicalField::Debit => &self.debit,
            CanonicalField::Credit => &self.credit,
            CanonicalField::Balance => &self.balance,
            CanonicalField::Category => &self.category,
            CanonicalField::Reference => &self.reference,
        };
        if field == CanonicalField::Amount {
            words.iter().any(|w| header == *w)
        } else {
            words.iter().any(|w| header.contains(w.as_str()))
        }
    }
}

const FIELD_ORDER: &[CanonicalField] = &[
    CanonicalField::Date,
    CanonicalField::Description,
    CanonicalField::Amount,
    CanonicalField::Debit,
    CanonicalField::Credit,
    CanonicalField::Balance,
    CanonicalField::Category,
    CanonicalField::Reference,
];

/// Map raw headers to canonical fields. First keyword match wins; a field
/// already claimed by an earlier column ignores later matching headers.
pub fn auto_map(headers: &[String], keywords: &FieldKeywords) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for (idx, header) in headers.iter().enumerate() {
        let header = header.trim().to_lowercase();
        if header.is_empty() {
            continue;
        }
        for &field in FIELD_ORDER {
            if mapping.slot(field).is_some() {
                continue;
            }
            if keywords.matches(field, &header) {
                mapping.set(field, idx);
                break;
            }
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(h: &[&str]) -> Vec<String> {
        h.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_basic_english_headers() {
        let m = auto_map(
            &headers(&["Date", "Description", "Amount", "Balance"]),
            &FieldKeywords::default(),
        );
        assert_eq!(m.date, Some(0));
        assert_eq!(m.description, Some(1));
        assert_eq!(m.amount, Some(2));
        assert_eq!(m.balance, Some(3));
    }

    #[test]
    fn test_spanish_headers() {
        let m = auto_map(
            &headers(&["Fecha", "Concepto", "Importe", "Saldo"]),
            &FieldKeywords::default(),
        );
        assert_eq!(m.date, Some(0));
        assert_eq!(m.description, Some(1));
        assert_eq!(m.amount, Some(2));
        assert_eq!(m.balance, Some(3));
    }

    #[test]
    fn test_debit_credit_split_columns() {
        let m = auto_map(
            &headers(&["Booking Date", "Details", "Debit", "Credit"]),
            &FieldKeywords::default(),
        );
        assert_eq!(m.date, Some(0));
        assert_eq!(m.description, Some(1));
        assert_eq!(m.debit, Some(2));
        assert_eq!(m.credit, Some(3));
        assert_eq!(m.amount, None);
    }

    #[test]
    fn test_first_claim_wins() {
        let m = auto_map(
            &headers(&["Date", "Value Date", "Amount"]),
            &FieldKeywords::default(),
        );
        assert_eq!(m.date, Some(0));
    }

    #[test]
    fn test_amount_requires_exact_match() {
        let m = auto_map(
            &headers(&["Date", "Description", "Amount Debit", "Amount Credit"]),
            &FieldKeywords::default(),
        );
        assert_eq!(m.amount, None);
        // "Amount Debit" still matches the debit keyword by substring.
        assert_eq!(m.debit, Some(2));
        assert_eq!(m.credit, Some(3));
    }

    #[test]
    fn test_override_replaces_auto_detection() {
        let mut m = auto_map(
            &headers(&["Date", "Description", "Amount"]),
            &FieldKeywords::default(),
        );
        m.set(CanonicalField::Description, 2);
        assert_eq!(m.description, Some(2));
    }

    #[test]
    fn test_warnings_for_missing_required_fields() {
        let m = auto_map(&headers(&["Foo", "Bar"]), &FieldKeywords::default());
        let warnings = m.warnings();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_no_warning_with_debit_credit_only() {
        let m = auto_map(
            &headers(&["Date", "Concept", "Debe", "Haber"]),
            &FieldKeywords::default(),
        );
        assert!(m.warnings().is_empty());
    }

    #[test]
    fn test_keyword_file_extends_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.json");
        std::fs::write(&path, r#"{"date": ["datum"], "description": ["verwendungszweck"]}"#)
            .unwrap();
        let kw = FieldKeywords::load(&path);
        let m = auto_map(&headers(&["Datum", "Verwendungszweck", "Amount"]), &kw);
        assert_eq!(m.date, Some(0));
        assert_eq!(m.description, Some(1));
        // Defaults survive the merge.
        assert!(kw.date.contains(&"fecha".to_string()));
    }

    #[test]
    fn test_keyword_file_missing_uses_defaults() {
        let kw = FieldKeywords::load(Path::new("/nonexistent/keywords.json"));
        assert!(kw.amount.contains(&"importe".to_string()));
    }
}
