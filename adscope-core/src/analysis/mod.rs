//! Month-over-month comparison report for one ad account
//!
//! Fetches the last two calendar months of lead-form campaigns, asks the model
//! for a marketing analysis of both tables and writes the conclusion to a text
//! file and to `analysis_results`.

use chrono::{Datelike, NaiveDate};
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::clock::Clock;
use crate::config::AgentConfig;
use crate::config::constants::{prompts, storage};
use crate::facebook::{AdsInsightsSource, CampaignRow, FacebookError, normalize_account_id};
use crate::llm::{LLMError, LLMProvider, LLMRequest, Message};
use crate::storage::{AnalysisResult, NewAnalysisResult, NewCampaignPerformance, Store, StoreError};
use crate::tools::{ReportingPeriod, last_two_months};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Facebook(#[from] FacebookError),
    #[error(transparent)]
    Llm(#[from] LLMError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("the model returned an empty analysis")]
    EmptyAnalysis,
}

#[derive(Debug, Clone)]
pub struct MonthlyReport {
    pub path: PathBuf,
    pub conclusion: String,
    pub analysis: AnalysisResult,
    pub last_month: ReportingPeriod,
    pub previous_month: ReportingPeriod,
}

#[derive(Debug, Clone)]
pub enum ReportOutcome {
    Generated(MonthlyReport),
    /// One of the months had no lead-form data
    Skipped {
        last_month_rows: usize,
        previous_month_rows: usize,
    },
}

pub struct MonthlyComparison {
    source: Arc<dyn AdsInsightsSource>,
    llm: Arc<dyn LLMProvider>,
    store: Store,
    clock: Arc<dyn Clock>,
    agent: AgentConfig,
    output_dir: PathBuf,
}

impl MonthlyComparison {
    pub fn new(
        source: Arc<dyn AdsInsightsSource>,
        llm: Arc<dyn LLMProvider>,
        store: Store,
        clock: Arc<dyn Clock>,
        agent: AgentConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            llm,
            store,
            clock,
            agent,
            output_dir: output_dir.into(),
        }
    }

    pub async fn run(
        &self,
        ad_account_id: &str,
        user_id: Option<i64>,
    ) -> Result<ReportOutcome, AnalysisError> {
        let account = normalize_account_id(ad_account_id);
        let (last_month, previous_month) = last_two_months(self.clock.today());

        let last_rows = self
            .source
            .campaign_rows(&account, last_month.start, last_month.end)
            .await?;
        let previous_rows = self
            .source
            .campaign_rows(&account, previous_month.start, previous_month.end)
            .await?;

        if last_rows.is_empty() || previous_rows.is_empty() {
            info!(
                account = %account,
                last_month_rows = last_rows.len(),
                previous_month_rows = previous_rows.len(),
                "skipping analysis: lead form data is missing for one or both months"
            );
            return Ok(ReportOutcome::Skipped {
                last_month_rows: last_rows.len(),
                previous_month_rows: previous_rows.len(),
            });
        }

        let facebook_account_id = self
            .store
            .find_account_by_ad_account_id(&account)?
            .map(|stored| stored.id);
        self.snapshot(&account, facebook_account_id, last_month, &last_rows)?;
        self.snapshot(&account, facebook_account_id, previous_month, &previous_rows)?;

        let prompt = comparison_prompt(
            &month_label(last_month.start),
            &month_label(previous_month.start),
            &last_rows,
            &previous_rows,
        );
        let request = LLMRequest::new(self.llm.model(), vec![Message::user(prompt)])
            .with_system_prompt(prompts::REPORT_SYSTEM_PROMPT)
            .with_temperature(self.agent.temperature)
            .with_max_tokens(self.agent.max_tokens);
        let conclusion = self
            .llm
            .generate(request)
            .await?
            .content
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(AnalysisError::EmptyAnalysis)?;

        let file_name = report_file_name(
            &account,
            previous_month,
            last_month,
            &self.clock.now().format("%Y%m%d_%H%M%S").to_string(),
        );
        let path = self.output_dir.join(file_name);
        write_report(&path, &conclusion).await?;

        let analysis = self.store.insert_analysis_result(&NewAnalysisResult {
            user_id,
            session_id: None,
            analysis_type: storage::MONTHLY_COMPARISON.to_string(),
            facebook_account_id,
            result_text: conclusion.clone(),
            analysis_metadata: Some(json!({
                "ad_account_id": account,
                "last_month": {
                    "start": last_month.start,
                    "end": last_month.end,
                    "campaigns": last_rows.len(),
                },
                "previous_month": {
                    "start": previous_month.start,
                    "end": previous_month.end,
                    "campaigns": previous_rows.len(),
                },
                "report_file": path.display().to_string(),
                "model": self.llm.model(),
            })),
        })?;

        info!(account = %account, path = %path.display(), "monthly comparison saved");
        Ok(ReportOutcome::Generated(MonthlyReport {
            path,
            conclusion,
            analysis,
            last_month,
            previous_month,
        }))
    }

    fn snapshot(
        &self,
        account: &str,
        facebook_account_id: Option<i64>,
        period: ReportingPeriod,
        rows: &[CampaignRow],
    ) -> Result<(), AnalysisError> {
        let records = rows
            .iter()
            .map(|row| -> Result<NewCampaignPerformance, AnalysisError> {
                Ok(NewCampaignPerformance {
                    ad_account_id: account.to_string(),
                    campaign_id: row.campaign_id.clone(),
                    campaign_name: Some(row.campaign_name.clone()),
                    date: period.start,
                    metrics: serde_json::to_value(row).map_err(StoreError::from)?,
                    facebook_account_id,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.store.insert_campaign_performance(&records)?;
        Ok(())
    }
}

async fn write_report(path: &Path, conclusion: &str) -> Result<(), AnalysisError> {
    let io_error = |source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(path, conclusion).await.map_err(io_error)
}

/// `adscope_report__act_{id}__Lead_Form_{prev}-{last}_{timestamp}.txt`
pub fn report_file_name(
    ad_account_id: &str,
    previous_month: ReportingPeriod,
    last_month: ReportingPeriod,
    timestamp: &str,
) -> String {
    let client_id = ad_account_id.trim_start_matches("act_");
    format!(
        "adscope_report__act_{client_id}__Lead_Form_{}-{}_{timestamp}.txt",
        previous_month.file_label(),
        last_month.file_label()
    )
}

/// Spanish month label such as "abril de 2024"
pub fn month_label(date: NaiveDate) -> String {
    const MONTHS: [&str; 12] = [
        "enero",
        "febrero",
        "marzo",
        "abril",
        "mayo",
        "junio",
        "julio",
        "agosto",
        "septiembre",
        "octubre",
        "noviembre",
        "diciembre",
    ];
    format!("{} de {}", MONTHS[date.month0() as usize], date.year())
}

/// Markdown table of the rows in report column order
pub fn markdown_table(rows: &[CampaignRow]) -> String {
    let mut table = String::new();
    let _ = writeln!(table, "| {} |", CampaignRow::COLUMNS.join(" | "));
    let _ = writeln!(
        table,
        "|{}",
        CampaignRow::COLUMNS.iter().map(|_| "---|").collect::<String>()
    );
    for row in rows {
        let cells: Vec<String> = row.cells().iter().map(|cell| cell.replace('|', "\\|")).collect();
        let _ = writeln!(table, "| {} |", cells.join(" | "));
    }
    table
}

pub fn comparison_prompt(
    current_month: &str,
    previous_month: &str,
    current_rows: &[CampaignRow],
    previous_rows: &[CampaignRow],
) -> String {
    format!(
        "Tienes que analizar los resultados de la tabla del mes de {current_month} (tabla_n) y la del mes de {previous_month} (tabla_n-1) y sacar las siguientes conclusiones:

1. Separa las campañas Lead Form.
2. Compara los costo por resultado de cada una de las campañas.
3. Compara los CTR (porcentaje de clics en el enlace) de cada una de las campañas.
4. Compara la cantidad de resultados (leads) de cada una de las campañas. ¿Por qué hubo más o menos resultados respecto al mes anterior (mayor o menor inversión, mayor o menor costo por resultado)?
5. Haz un listado de las principales medidas a realizar para mejorar el performance.

Aquí están los datos:

## Tabla N ({current_month}):
{}
## Tabla N-1 ({previous_month}):
{}",
        markdown_table(current_rows),
        markdown_table(previous_rows)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> CampaignRow {
        serde_json::from_value(json!({
            "ID Campaña": "42",
            "Inicio del informe": "2024-04-01",
            "Fin del informe": "2024-04-30",
            "Nombre de la campaña": name,
            "Importe gastado (CLP)": 1234.5,
            "Resultados": 7
        }))
        .unwrap()
    }

    fn period(month: u32, last_day: u32) -> ReportingPeriod {
        ReportingPeriod {
            start: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, month, last_day).unwrap(),
        }
    }

    #[test]
    fn file_name_strips_act_prefix() {
        assert_eq!(
            report_file_name("act_123", period(3, 31), period(4, 30), "20240502_101500"),
            "adscope_report__act_123__Lead_Form_2024_03-2024_04_20240502_101500.txt"
        );
    }

    #[test]
    fn spanish_month_labels() {
        assert_eq!(month_label(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()), "abril de 2024");
        assert_eq!(month_label(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()), "diciembre de 2023");
    }

    #[test]
    fn markdown_table_has_header_separator_and_rows() {
        let table = markdown_table(&[row("Lead Form | A")]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("| ID Campaña | Inicio del informe |"));
        assert_eq!(lines[1].matches("---|").count(), CampaignRow::COLUMNS.len());
        assert!(lines[2].contains("Lead Form \\| A"));
        assert!(lines[2].contains("| 1234.5 |"));
    }

    #[test]
    fn prompt_lists_five_points_and_both_tables() {
        let prompt = comparison_prompt("abril de 2024", "marzo de 2024", &[row("A")], &[row("B")]);
        assert!(
            prompt.starts_with("Tienes que analizar los resultados de la tabla del mes de abril de 2024")
        );
        for point in ["1. ", "2. ", "3. ", "4. ", "5. "] {
            assert!(prompt.contains(point));
        }
        assert!(prompt.contains("## Tabla N (abril de 2024):"));
        assert!(prompt.contains("## Tabla N-1 (marzo de 2024):"));
    }
}
