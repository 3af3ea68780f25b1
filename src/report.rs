//! Report assembly: classification, context derivation and per-field resolution
//! composed into one [`FactRecord`] per document.
//!
//! The resolution engine is shared; each report shape is a [`ReportStrategy`]
//! supplying its field set and post-processing.

use crate::catalog::Catalog;
use crate::classify::{classify, find_quarter};
use crate::config::ResolverConfig;
use crate::context::{period_date, ContextSet};
use crate::normalize::{month_of, normalize, round2, securities_code, year_of, FactValue, ValueKind};
use crate::query::DocumentModel;
use crate::resolve::FactResolver;
use crate::segment::{resolve_segments, SegmentRecord};
use crate::{Error, Parser, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const SECURITY_CODE: &str = "security_code";
const FISCAL_YEAR_END: &str = "current_fiscal_year_end_date";
const SEGMENT_ITEMS: [&str; 2] = ["segment_sales", "segment_operating_profit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    SecurityReport,
    ResultsForecast,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::SecurityReport => "security_report",
            ReportKind::ResultsForecast => "results_forecast",
        }
    }
}

impl FromStr for ReportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "security" | "security_report" => Ok(ReportKind::SecurityReport),
            "forecast" | "results_forecast" => Ok(ReportKind::ResultsForecast),
            other => Err(Error::Config(format!("unknown report kind: {other}"))),
        }
    }
}

/// Context role a fact is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Duration,
    PriorDuration,
    Instant,
    FilingDate,
    /// Full-year forecast, shifted to the next year on Q4 filings.
    Forecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Fact { item: &'static str, role: Role },
    /// `period/{field}` of the current duration context.
    Period { field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source: Source,
    pub kind: ValueKind,
}

impl FieldSpec {
    pub const fn fact(name: &'static str, item: &'static str, role: Role, kind: ValueKind) -> Self {
        Self {
            name,
            source: Source::Fact { item, role },
            kind,
        }
    }

    pub const fn period(name: &'static str, field: &'static str) -> Self {
        Self {
            name,
            source: Source::Period { field },
            kind: ValueKind::Raw,
        }
    }
}

/// Resolved record for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRecord {
    pub report: ReportKind,
    pub code: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub quarter: u8,
    /// 1 consolidated, 0 non-consolidated.
    pub consolidation: i64,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<FactValue>>,
    pub segments: Vec<SegmentRecord>,
}

impl FactRecord {
    pub fn get(&self, field: &str) -> Option<&FactValue> {
        self.values.get(field).and_then(Option::as_ref)
    }

    pub fn set(&mut self, field: &str, value: Option<FactValue>) {
        self.values.insert(field.to_string(), value);
    }
}

pub trait ReportStrategy: Send + Sync {
    fn kind(&self) -> ReportKind;

    fn fields(&self) -> &[FieldSpec];

    fn include_segments(&self) -> bool {
        false
    }

    /// Derived values and header adjustments, applied after resolution.
    fn finish(&self, _record: &mut FactRecord) {}
}

use Role::*;
use ValueKind::{Float, Integer, Millions, Raw};

const SECURITY_REPORT_FIELDS: &[FieldSpec] = &[
    FieldSpec::fact("net_sales", "net_sales", Duration, Millions),
    FieldSpec::fact("operating_income", "operating_income", Duration, Millions),
    FieldSpec::fact("ordinary_income", "ordinary_income", Duration, Millions),
    FieldSpec::fact("net_income", "net_income", Duration, Millions),
    FieldSpec::fact("net_income_per_share", "net_income_per_share", Duration, Float),
    FieldSpec::fact("change_in_net_sales", "change_in_net_sales", Duration, Float),
    FieldSpec::fact("change_in_operating_income", "change_in_operating_income", Duration, Float),
    FieldSpec::fact("change_in_ordinary_income", "change_in_ordinary_income", Duration, Float),
    FieldSpec::fact("change_in_net_income", "change_in_net_income", Duration, Float),
    FieldSpec::fact("prior_net_sales", "net_sales", PriorDuration, Millions),
    FieldSpec::fact("prior_operating_income", "operating_income", PriorDuration, Millions),
    FieldSpec::fact("prior_ordinary_income", "ordinary_income", PriorDuration, Millions),
    FieldSpec::fact("prior_net_income", "net_income", PriorDuration, Millions),
    FieldSpec::fact("prior_net_income_per_share", "net_income_per_share", PriorDuration, Float),
    FieldSpec::fact("change_in_prior_net_sales", "change_in_net_sales", PriorDuration, Float),
    FieldSpec::fact("change_in_prior_operating_income", "change_in_operating_income", PriorDuration, Float),
    FieldSpec::fact("change_in_prior_ordinary_income", "change_in_ordinary_income", PriorDuration, Float),
    FieldSpec::fact("change_in_prior_net_income", "change_in_net_income", PriorDuration, Float),
    FieldSpec::fact("owners_equity", "owners_equity", Instant, Millions),
    FieldSpec::fact("number_of_shares", "number_of_shares", Instant, Integer),
    FieldSpec::fact("number_of_treasury_stock", "number_of_treasury_stock", Instant, Integer),
    FieldSpec::fact("net_assets_per_share", "net_assets_per_share", Instant, Float),
    FieldSpec::fact("forecast_net_sales", "forecast_net_sales", Forecast, Millions),
    FieldSpec::fact("forecast_operating_income", "forecast_operating_income", Forecast, Millions),
    FieldSpec::fact("forecast_ordinary_income", "forecast_ordinary_income", Forecast, Millions),
    FieldSpec::fact("forecast_net_income", "forecast_net_income", Forecast, Millions),
    FieldSpec::fact("forecast_net_income_per_share", "forecast_net_income_per_share", Forecast, Float),
    FieldSpec::fact("change_in_forecast_net_sales", "change_forecast_net_sales", Forecast, Float),
    FieldSpec::fact("change_in_forecast_operating_income", "change_forecast_operating_income", Forecast, Float),
    FieldSpec::fact("change_in_forecast_ordinary_income", "change_forecast_ordinary_income", Forecast, Float),
    FieldSpec::fact("change_in_forecast_net_income", "change_forecast_net_income", Forecast, Float),
    FieldSpec::fact("document_title_cover_page", "document_title_cover_page", FilingDate, Raw),
    FieldSpec::fact("fiscal_year_cover_page", "fiscal_year_cover_page", FilingDate, Raw),
    FieldSpec::fact("current_fiscal_year_end_date", "current_fiscal_year_end_date", FilingDate, Raw),
    FieldSpec::fact("company_name", "company_name", FilingDate, Raw),
    FieldSpec::fact("filing_date", "filing_date", FilingDate, Raw),
    FieldSpec::fact("current_fiscal_year_start_date", "current_fiscal_year_start_date", FilingDate, Raw),
    FieldSpec::fact("current_period_end_date", "current_period_end_date", FilingDate, Raw),
    FieldSpec::fact("type_of_current_period", "type_of_current_period", FilingDate, Raw),
    FieldSpec::period("start_date", "startDate"),
    FieldSpec::period("end_date", "endDate"),
    FieldSpec::fact("number_of_employees", "number_of_employees", Instant, Integer),
];

const RESULTS_FORECAST_FIELDS: &[FieldSpec] = &[
    FieldSpec::fact("forecast_net_sales", "forecast_net_sales", Forecast, Millions),
    FieldSpec::fact("forecast_operating_income", "forecast_operating_income", Forecast, Millions),
    FieldSpec::fact("forecast_ordinary_income", "forecast_ordinary_income", Forecast, Millions),
    FieldSpec::fact("forecast_net_income", "forecast_net_income", Forecast, Millions),
    FieldSpec::fact("forecast_net_income_per_share", "forecast_net_income_per_share", Forecast, Float),
    FieldSpec::fact("previous_forecast_net_sales", "previous_forecast_net_sales", Forecast, Millions),
    FieldSpec::fact("previous_forecast_operating_income", "previous_forecast_operating_income", Forecast, Millions),
    FieldSpec::fact("previous_forecast_ordinary_income", "previous_forecast_ordinary_income", Forecast, Millions),
    FieldSpec::fact("previous_forecast_net_income", "previous_forecast_net_income", Forecast, Millions),
    FieldSpec::fact("previous_forecast_net_income_per_share", "previous_forecast_net_income_per_share", Forecast, Float),
    FieldSpec::fact("change_in_forecast_net_sales", "change_forecast_net_sales", Forecast, Float),
    FieldSpec::fact("change_in_forecast_operating_income", "change_forecast_operating_income", Forecast, Float),
    FieldSpec::fact("change_in_forecast_ordinary_income", "change_forecast_ordinary_income", Forecast, Float),
    FieldSpec::fact("change_in_forecast_net_income", "change_forecast_net_income", Forecast, Float),
];

/// Annual and quarterly securities report.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityReport;

impl ReportStrategy for SecurityReport {
    fn kind(&self) -> ReportKind {
        ReportKind::SecurityReport
    }

    fn fields(&self) -> &[FieldSpec] {
        SECURITY_REPORT_FIELDS
    }

    fn include_segments(&self) -> bool {
        true
    }

    fn finish(&self, record: &mut FactRecord) {
        if record.get("net_assets_per_share").is_some() {
            return;
        }
        let equity = record.get("owners_equity").and_then(FactValue::as_i64);
        let shares = record.get("number_of_shares").and_then(FactValue::as_i64);
        let (Some(equity), Some(shares)) = (equity, shares) else {
            return;
        };
        let treasury = record
            .get("number_of_treasury_stock")
            .and_then(FactValue::as_i64)
            .unwrap_or(0);

        let outstanding = match shares.checked_sub(treasury) {
            Some(outstanding) if outstanding > 0 => outstanding,
            _ => {
                tracing::warn!(shares, treasury, "no outstanding shares, net assets per share not derived");
                return;
            }
        };
        let per_share = round2(equity as f64 * 1_000_000.0 / outstanding as f64);
        tracing::debug!(per_share, "derived net assets per share");
        record.set("net_assets_per_share", Some(FactValue::Float(per_share)));
    }
}

/// Full-year forecast figures. A Q4 filing's forecast concerns the next fiscal
/// year, so the header moves there.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsForecast;

impl ReportStrategy for ResultsForecast {
    fn kind(&self) -> ReportKind {
        ReportKind::ResultsForecast
    }

    fn fields(&self) -> &[FieldSpec] {
        RESULTS_FORECAST_FIELDS
    }

    fn finish(&self, record: &mut FactRecord) {
        if record.quarter == 4 {
            record.year = record.year.map(|y| y + 1);
        }
        record.quarter = 4;
    }
}

pub struct ReportAssembler {
    strategy: Box<dyn ReportStrategy>,
    catalog: Catalog,
    config: ResolverConfig,
}

impl ReportAssembler {
    /// Fails with [`Error::Catalog`] when a field names an item the catalog lacks.
    pub fn new<S>(strategy: S, catalog: Catalog, config: ResolverConfig) -> Result<Self>
    where
        S: ReportStrategy + 'static,
    {
        Self::from_boxed(Box::new(strategy), catalog, config)
    }

    pub fn for_kind(kind: ReportKind, catalog: Catalog, config: ResolverConfig) -> Result<Self> {
        let strategy: Box<dyn ReportStrategy> = match kind {
            ReportKind::SecurityReport => Box::new(SecurityReport),
            ReportKind::ResultsForecast => Box::new(ResultsForecast),
        };
        Self::from_boxed(strategy, catalog, config)
    }

    fn from_boxed(
        strategy: Box<dyn ReportStrategy>,
        catalog: Catalog,
        config: ResolverConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut required: Vec<&str> = vec![SECURITY_CODE, FISCAL_YEAR_END];
        required.extend(strategy.fields().iter().filter_map(|f| match f.source {
            Source::Fact { item, .. } => Some(item),
            Source::Period { .. } => None,
        }));
        if strategy.include_segments() {
            required.extend(SEGMENT_ITEMS);
        }
        let missing: Vec<&str> = required
            .into_iter()
            .filter(|item| !catalog.contains(item))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Catalog(format!(
                "catalog {} lacks items required by {}: {}",
                catalog.version(),
                strategy.kind().as_str(),
                missing.join(", ")
            )));
        }

        Ok(Self {
            strategy,
            catalog,
            config,
        })
    }

    pub fn kind(&self) -> ReportKind {
        self.strategy.kind()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves every field of the strategy. Classification, quarter and context
    /// failures abort the whole record; a missing fact is just `None`.
    pub fn assemble<D>(&self, doc: &D) -> Result<FactRecord>
    where
        D: DocumentModel + ?Sized,
    {
        let classification = classify(doc, &self.config)?;
        let contexts = classification.contexts(&self.config)?;
        let resolver = FactResolver::new(doc, &self.config);

        let fiscal_year_end = self
            .catalog
            .get(FISCAL_YEAR_END)
            .and_then(|item| resolver.resolve_unscoped(item));
        let quarter = find_quarter(doc, &contexts, fiscal_year_end)?;

        let year_end = fiscal_year_end
            .filter(|d| year_of(d).is_some())
            .or_else(|| period_date(doc, &contexts.year_duration(), "endDate"));
        let code = self
            .catalog
            .get(SECURITY_CODE)
            .and_then(|item| resolver.resolve_unscoped(item))
            .and_then(securities_code);

        let mut record = FactRecord {
            report: self.strategy.kind(),
            code,
            year: year_end.and_then(year_of),
            month: year_end.and_then(month_of),
            quarter,
            consolidation: classification.consolidation.flag(),
            values: BTreeMap::new(),
            segments: Vec::new(),
        };

        let forecast = contexts.forecast(quarter);
        for field in self.strategy.fields() {
            let raw = match field.source {
                Source::Fact { item, role } => {
                    let ids = role_ids(&contexts, role, &forecast);
                    self.catalog
                        .get(item)
                        .and_then(|candidates| resolver.resolve(candidates, ids))
                }
                Source::Period { field: tag } => period_date(doc, &contexts.duration, tag),
            };
            record.set(field.name, normalize(raw, field.kind));
        }

        if self.strategy.include_segments() {
            record.segments = resolve_segments(&resolver, &self.catalog, &contexts, &self.config);
        }
        self.strategy.finish(&mut record);

        tracing::debug!(
            report = record.report.as_str(),
            code = ?record.code,
            quarter = record.quarter,
            resolved = record.values.values().filter(|v| v.is_some()).count(),
            fields = record.values.len(),
            "assembled report"
        );
        Ok(record)
    }

    pub fn assemble_file<P: AsRef<Path>>(&self, path: P) -> Result<FactRecord> {
        let doc = Parser::new().parse_file(path)?;
        self.assemble(&doc)
    }

    /// One independent run per file; results keep the input order.
    #[cfg(feature = "parallel")]
    pub fn assemble_files<P>(&self, paths: &[P]) -> Vec<Result<FactRecord>>
    where
        P: AsRef<Path> + Sync,
    {
        paths.par_iter().map(|p| self.assemble_file(p)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    pub fn assemble_files<P>(&self, paths: &[P]) -> Vec<Result<FactRecord>>
    where
        P: AsRef<Path> + Sync,
    {
        paths.iter().map(|p| self.assemble_file(p)).collect()
    }
}

fn role_ids<'a>(contexts: &'a ContextSet, role: Role, forecast: &'a [String]) -> &'a [String] {
    match role {
        Duration => &contexts.duration,
        PriorDuration => &contexts.prior_duration,
        Instant => &contexts.instant,
        FilingDate => &contexts.filing_date_instant,
        Forecast => forecast,
    }
}

/// Security report with the built-in catalog and default configuration.
pub fn assemble_report<D>(doc: &D) -> Result<FactRecord>
where
    D: DocumentModel + ?Sized,
{
    ReportAssembler::new(SecurityReport, Catalog::builtin()?, ResolverConfig::default())?
        .assemble(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use pretty_assertions::assert_eq;

    fn annual(balance: &str) -> Document {
        let xml = format!(
            r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
                xmlns:jpcrp_cor="http://disclosure.edinet-fsa.go.jp/taxonomy/jpcrp/2019-11-01/jpcrp_cor"
                xmlns:jppfs_cor="http://disclosure.edinet-fsa.go.jp/taxonomy/jppfs/2019-11-01/jppfs_cor"
                xmlns:jpdei_cor="http://disclosure.edinet-fsa.go.jp/taxonomy/jpdei/2013-08-31/jpdei_cor">
              <xbrli:context id="CurrentYearDuration">
                <xbrli:entity><xbrli:identifier scheme="http://disclosure.edinet-fsa.go.jp">E00001-000</xbrli:identifier></xbrli:entity>
                <xbrli:period><xbrli:startDate>2015-04-01</xbrli:startDate><xbrli:endDate>2016-03-31</xbrli:endDate></xbrli:period>
              </xbrli:context>
              <xbrli:context id="CurrentYearInstant">
                <xbrli:entity><xbrli:identifier scheme="http://disclosure.edinet-fsa.go.jp">E00001-000</xbrli:identifier></xbrli:entity>
                <xbrli:period><xbrli:instant>2016-03-31</xbrli:instant></xbrli:period>
              </xbrli:context>
              <jpdei_cor:SecurityCodeDEI contextRef="FilingDateInstant">99840</jpdei_cor:SecurityCodeDEI>
              <jpcrp_cor:NetSalesSummaryOfBusinessResults contextRef="CurrentYearDuration">66707000000</jpcrp_cor:NetSalesSummaryOfBusinessResults>
              {balance}
            </xbrli:xbrl>"#
        );
        crate::Parser::new().parse_str(&xml).unwrap()
    }

    const EQUITY_AND_SHARES: &str = r#"
        <jppfs_cor:OwnersEquity contextRef="CurrentYearInstant">500000000</jppfs_cor:OwnersEquity>
        <jpcrp_cor:NumberOfIssuedAndOutstandingSharesAtTheEndOfFiscalYearIncludingTreasuryStock contextRef="CurrentYearInstant">1000000</jpcrp_cor:NumberOfIssuedAndOutstandingSharesAtTheEndOfFiscalYearIncludingTreasuryStock>"#;

    #[test]
    fn header_and_direct_facts() {
        let doc = annual("");
        let record = assemble_report(&doc).unwrap();
        assert_eq!(record.report, ReportKind::SecurityReport);
        assert_eq!(record.code.as_deref(), Some("9984"));
        assert_eq!(record.year, Some(2016));
        assert_eq!(record.month, Some(3));
        assert_eq!(record.quarter, 4);
        assert_eq!(record.consolidation, 1);
        assert_eq!(record.get("net_sales"), Some(&FactValue::Millions(66707)));
        assert_eq!(record.get("start_date"), Some(&FactValue::Text("2015-04-01".to_string())));
        assert_eq!(record.get("operating_income"), None);
        assert!(record.values.contains_key("operating_income"));
        assert!(record.segments.is_empty());
    }

    #[test]
    fn derives_net_assets_per_share() {
        let doc = annual(EQUITY_AND_SHARES);
        let record = assemble_report(&doc).unwrap();
        assert_eq!(record.get("owners_equity"), Some(&FactValue::Millions(500)));
        assert_eq!(record.get("net_assets_per_share"), Some(&FactValue::Float(500.00)));
    }

    #[test]
    fn subtracts_treasury_shares() {
        let doc = annual(&format!(
            r#"{EQUITY_AND_SHARES}<jpcrp_cor:NumberOfTreasuryStockAtTheEndOfFiscalYear contextRef="CurrentYearInstant">250000</jpcrp_cor:NumberOfTreasuryStockAtTheEndOfFiscalYear>"#
        ));
        let record = assemble_report(&doc).unwrap();
        assert_eq!(record.get("net_assets_per_share"), Some(&FactValue::Float(666.67)));
    }

    #[test]
    fn reported_net_assets_per_share_wins() {
        let doc = annual(&format!(
            r#"{EQUITY_AND_SHARES}<jpcrp_cor:NetAssetsPerShare contextRef="CurrentYearInstant">162.66</jpcrp_cor:NetAssetsPerShare>"#
        ));
        let record = assemble_report(&doc).unwrap();
        assert_eq!(record.get("net_assets_per_share"), Some(&FactValue::Float(162.66)));
    }

    #[test]
    fn no_derivation_without_outstanding_shares() {
        let doc = annual(&format!(
            r#"{EQUITY_AND_SHARES}<jpcrp_cor:NumberOfTreasuryStockAtTheEndOfFiscalYear contextRef="CurrentYearInstant">1000000</jpcrp_cor:NumberOfTreasuryStockAtTheEndOfFiscalYear>"#
        ));
        let record = assemble_report(&doc).unwrap();
        assert_eq!(record.get("net_assets_per_share"), None);
    }

    #[test]
    fn no_derivation_when_share_count_overflows() {
        let doc = annual(
            r#"<jppfs_cor:OwnersEquity contextRef="CurrentYearInstant">500000000</jppfs_cor:OwnersEquity>
            <jpcrp_cor:NumberOfIssuedAndOutstandingSharesAtTheEndOfFiscalYearIncludingTreasuryStock contextRef="CurrentYearInstant">9223372036854775807</jpcrp_cor:NumberOfIssuedAndOutstandingSharesAtTheEndOfFiscalYearIncludingTreasuryStock>
            <jpcrp_cor:NumberOfTreasuryStockAtTheEndOfFiscalYear contextRef="CurrentYearInstant">-1</jpcrp_cor:NumberOfTreasuryStockAtTheEndOfFiscalYear>"#,
        );
        let record = assemble_report(&doc).unwrap();
        assert_eq!(record.get("number_of_shares"), Some(&FactValue::Integer(i64::MAX)));
        assert_eq!(record.get("net_assets_per_share"), None);
    }

    fn quarterly(facts: &[(&str, &str)]) -> Document {
        let body: String = facts
            .iter()
            .map(|(context, value)| {
                format!(
                    r#"<jpcrp_cor:NetSalesSummaryOfBusinessResults contextRef="{context}">{value}</jpcrp_cor:NetSalesSummaryOfBusinessResults>"#
                )
            })
            .collect();
        let xml = format!(
            r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
                xmlns:jpcrp_cor="http://disclosure.edinet-fsa.go.jp/taxonomy/jpcrp/2019-11-01/jpcrp_cor">
              <xbrli:context id="CurrentYTDDuration">
                <xbrli:entity><xbrli:identifier scheme="http://disclosure.edinet-fsa.go.jp">E00001-000</xbrli:identifier></xbrli:entity>
                <xbrli:period><xbrli:startDate>2016-04-01</xbrli:startDate><xbrli:endDate>2016-09-30</xbrli:endDate></xbrli:period>
              </xbrli:context>
              <xbrli:context id="CurrentQuarterDuration">
                <xbrli:entity><xbrli:identifier scheme="http://disclosure.edinet-fsa.go.jp">E00001-000</xbrli:identifier></xbrli:entity>
                <xbrli:period><xbrli:startDate>2016-07-01</xbrli:startDate><xbrli:endDate>2016-09-30</xbrli:endDate></xbrli:period>
              </xbrli:context>
              <xbrli:context id="CurrentYearDuration">
                <xbrli:entity><xbrli:identifier scheme="http://disclosure.edinet-fsa.go.jp">E00001-000</xbrli:identifier></xbrli:entity>
                <xbrli:period><xbrli:startDate>2016-04-01</xbrli:startDate><xbrli:endDate>2017-03-31</xbrli:endDate></xbrli:period>
              </xbrli:context>
              <xbrli:context id="CurrentQuarterInstant">
                <xbrli:entity><xbrli:identifier scheme="http://disclosure.edinet-fsa.go.jp">E00001-000</xbrli:identifier></xbrli:entity>
                <xbrli:period><xbrli:instant>2016-09-30</xbrli:instant></xbrli:period>
              </xbrli:context>
              {body}
            </xbrli:xbrl>"#
        );
        crate::Parser::new().parse_str(&xml).unwrap()
    }

    #[test]
    fn quarter_figure_wins_over_year_to_date_in_either_order() {
        let quarter = ("CurrentQuarterDuration", "3000000000");
        let ytd = ("CurrentYTDDuration", "6000000000");
        for doc in [quarterly(&[quarter, ytd]), quarterly(&[ytd, quarter])] {
            let record = assemble_report(&doc).unwrap();
            assert_eq!(record.quarter, 2);
            assert_eq!(record.get("net_sales"), Some(&FactValue::Millions(3000)));
            assert_eq!(record.get("start_date"), Some(&FactValue::Text("2016-07-01".to_string())));
        }

        let record = assemble_report(&quarterly(&[ytd])).unwrap();
        assert_eq!(record.get("net_sales"), Some(&FactValue::Millions(6000)));
    }

    #[test]
    fn assembly_is_repeatable() {
        let doc = annual(EQUITY_AND_SHARES);
        let first = assemble_report(&doc).unwrap();
        let second = assemble_report(&doc).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn forecast_moves_q4_header_to_next_year() {
        let doc = annual("");
        let assembler = ReportAssembler::for_kind(
            ReportKind::ResultsForecast,
            Catalog::builtin().unwrap(),
            ResolverConfig::default(),
        )
        .unwrap();
        let record = assembler.assemble(&doc).unwrap();
        assert_eq!(record.report, ReportKind::ResultsForecast);
        assert_eq!(record.year, Some(2017));
        assert_eq!(record.quarter, 4);
        assert!(record.values.contains_key("previous_forecast_net_sales"));
        assert!(!record.values.contains_key("net_sales"));
    }

    #[test]
    fn unclassifiable_document_yields_no_record() {
        let doc = crate::Parser::new()
            .parse_str(r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"/>"#)
            .unwrap();
        let err = assemble_report(&doc).unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
    }

    #[test]
    fn catalog_mismatch_is_caught_at_construction() {
        let catalog = Catalog::from_json(
            r#"{"version": "tiny", "items": {"security_code": ["SecurityCodeDEI"], "current_fiscal_year_end_date": ["CurrentFiscalYearEndDateDEI"]}}"#,
        )
        .unwrap();
        let err = ReportAssembler::new(ResultsForecast, catalog, ResolverConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Catalog(msg) if msg.contains("forecast_net_sales")));
    }

    #[test]
    fn report_kind_names() {
        assert_eq!("security".parse::<ReportKind>().unwrap(), ReportKind::SecurityReport);
        assert_eq!("results_forecast".parse::<ReportKind>().unwrap(), ReportKind::ResultsForecast);
        assert!(matches!("summary".parse::<ReportKind>(), Err(Error::Config(_))));
    }
}
