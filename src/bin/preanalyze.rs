//! Evaluates applicant financials from a JSON file and prints the pre-analysis.
//!
//! Usage: `preanalyze <financials.json>` or `-` to read stdin.
//! Pass `--json` after the path to print the full report as JSON instead.

use anyhow::Context;
use std::io::Read;

use rust_credit_api::engine::PreAnalysisEngine;
use rust_credit_api::models::ApplicantFinancials;
use rust_credit_api::normalizer::{format_brl, format_cnpj, format_cpf, TaxIdKind};
use rust_credit_api::validation;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let source = args
        .next()
        .context("usage: preanalyze <financials.json | -> [--json]")?;
    let as_json = args.any(|a| a == "--json");

    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading financials from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&source).with_context(|| format!("reading {}", source))?
    };

    let financials: ApplicantFinancials =
        serde_json::from_str(&raw).context("parsing applicant financials")?;
    let kind = validation::validate_financials(&financials)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let report = PreAnalysisEngine::new().evaluate(&financials);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let tax_id = match kind {
        TaxIdKind::Cnpj => format_cnpj(&financials.tax_id),
        TaxIdKind::Cpf => format_cpf(&financials.tax_id),
    };
    let decision = &report.decision;

    println!("{} ({})", financials.legal_name, tax_id);
    println!();
    for component in &report.breakdown.components {
        println!("  {:<28} {:>3}  {}", component.factor.label(), component.points, component.note);
    }
    println!("  {:<28} {:>3}/100", "Score", decision.score());
    println!();
    println!("{}", decision.message());
    println!(
        "Taxa: {:.2}% a.m. ({:.2}% a.a.)",
        decision.interest_rate_monthly() * 100.0,
        decision.interest_rate_annual() * 100.0
    );
    println!("Limite aprovado: {}", format_brl(decision.approved_limit()));
    println!(
        "Parcela: {} / máximo {} ({})",
        format_brl(report.affordability.installment),
        format_brl(report.affordability.max_installment),
        if report.affordability.affordable {
            "viável"
        } else {
            "acima da capacidade"
        }
    );

    Ok(())
}
