use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::normalizer::{normalize_tax_id, TaxIdKind};

// ============ Pre-analysis input ============

/// Business segment declared by the applicant.
///
/// Free text is accepted on the wire; anything unrecognized lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Segment {
    Commerce,
    Services,
    Industry,
    Technology,
    Health,
    Education,
    Agribusiness,
    Construction,
    #[default]
    Other,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Commerce => "comercio",
            Segment::Services => "servicos",
            Segment::Industry => "industria",
            Segment::Technology => "tecnologia",
            Segment::Health => "saude",
            Segment::Education => "educacao",
            Segment::Agribusiness => "agronegocio",
            Segment::Construction => "construcao",
            Segment::Other => "outro",
        }
    }
}

impl From<String> for Segment {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "comercio" | "commerce" => Segment::Commerce,
            "servicos" | "services" => Segment::Services,
            "industria" | "industry" => Segment::Industry,
            "tecnologia" | "technology" => Segment::Technology,
            "saude" | "health" => Segment::Health,
            "educacao" | "education" => Segment::Education,
            "agronegocio" | "agribusiness" => Segment::Agribusiness,
            "construcao" | "construction" => Segment::Construction,
            _ => Segment::Other,
        }
    }
}

impl From<Segment> for String {
    fn from(segment: Segment) -> Self {
        segment.as_str().to_string()
    }
}

/// Asset types offered as security for the credit line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collateral {
    #[serde(rename = "imovel", alias = "property")]
    Property,
    #[serde(rename = "veiculo", alias = "vehicle")]
    Vehicle,
    #[serde(rename = "recebivel", alias = "receivables")]
    Receivables,
    #[serde(rename = "equipamento", alias = "equipment")]
    Equipment,
    #[serde(rename = "aval", alias = "partner_guarantee")]
    PartnerGuarantee,
    #[serde(rename = "estoque", alias = "inventory")]
    Inventory,
    /// Reserved value: no collateral offered.
    #[serde(rename = "sem_garantia", alias = "no_collateral")]
    NoCollateral,
}

/// Self-declared credit history rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditHistory {
    #[serde(rename = "excelente", alias = "excellent")]
    Excellent,
    #[serde(rename = "bom", alias = "good")]
    Good,
    #[serde(rename = "regular")]
    Regular,
    #[serde(rename = "ruim", alias = "poor")]
    Poor,
    #[serde(rename = "sem_historico", alias = "none")]
    None,
}

/// What the credit is for. Informational only, never scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditPurpose {
    #[serde(rename = "capital_giro", alias = "working_capital")]
    WorkingCapital,
    #[serde(rename = "expansao", alias = "expansion")]
    Expansion,
    #[serde(rename = "equipamentos", alias = "equipment")]
    Equipment,
    #[serde(rename = "refinanciamento", alias = "refinancing")]
    Refinancing,
    #[serde(rename = "estoque", alias = "inventory")]
    Inventory,
    #[serde(rename = "imovel", alias = "real_estate")]
    RealEstate,
    #[serde(rename = "outro", alias = "other")]
    Other,
}

/// Applicant and business figures for one pre-analysis evaluation.
///
/// Amounts are raw numbers in BRL. Formatting happens only when presenting,
/// see [`crate::normalizer::format_brl`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantFinancials {
    /// Legal name (razão social) or full name.
    pub legal_name: String,
    /// CPF or CNPJ, formatted or not.
    pub tax_id: String,
    #[serde(default)]
    pub segment: Segment,
    pub years_active: f64,
    pub annual_revenue: f64,
    pub monthly_revenue: f64,
    /// Profit margin in percent, 0 to 100.
    pub profit_margin_pct: f64,
    pub current_debt: f64,
    pub requested_amount: f64,
    pub term_months: u32,
    pub collateral: BTreeSet<Collateral>,
    pub credit_history: CreditHistory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<CreditPurpose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ApplicantFinancials {
    /// True only when the collateral set is exactly `{NoCollateral}`.
    pub fn offers_no_collateral(&self) -> bool {
        self.collateral.len() == 1 && self.collateral.contains(&Collateral::NoCollateral)
    }

    /// Tax id with formatting stripped.
    pub fn tax_id_digits(&self) -> String {
        normalize_tax_id(&self.tax_id)
    }

    /// Person or organization, when the tax id has a valid shape.
    pub fn tax_id_kind(&self) -> Option<TaxIdKind> {
        TaxIdKind::classify(&self.tax_id_digits())
    }
}
