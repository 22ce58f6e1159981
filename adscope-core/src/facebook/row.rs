use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::facebook::insights::{Campaign, Insight, parse_results};

/// One campaign's performance over a reporting period.
///
/// Serialized field names are the Spanish report column names, which is also
/// the shape stored in the insights cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRow {
    #[serde(rename = "ID Campaña")]
    pub campaign_id: String,
    #[serde(rename = "Inicio del informe")]
    pub report_start: NaiveDate,
    #[serde(rename = "Fin del informe")]
    pub report_end: NaiveDate,
    #[serde(rename = "Nombre de la campaña", alias = "name")]
    pub campaign_name: String,
    #[serde(rename = "Objective", default)]
    pub objective: Option<String>,
    #[serde(rename = "Entrega de la campaña", default)]
    pub effective_status: Option<String>,
    #[serde(rename = "Resultados", default)]
    pub results: i64,
    #[serde(rename = "Indicador de resultado", default)]
    pub result_indicator: String,
    #[serde(rename = "Indicador de resultado _REAL", default)]
    pub real_indicator: String,
    #[serde(rename = "Alcance", default)]
    pub reach: i64,
    #[serde(rename = "Frecuencia", default)]
    pub frequency: f64,
    #[serde(rename = "Costo por resultados (CLP)", default)]
    pub cost_per_result: f64,
    #[serde(rename = "Presupuesto del conjunto de anuncios", default)]
    pub budget: f64,
    #[serde(rename = "Tipo de presupuesto del conjunto de anuncios", default)]
    pub budget_type: String,
    #[serde(rename = "Importe gastado (CLP)", default)]
    pub spend: f64,
    #[serde(rename = "Finalización", default)]
    pub stop_time: String,
    #[serde(rename = "Impresiones", default)]
    pub impressions: i64,
    #[serde(rename = "CPM (costo por mil impresiones) (CLP)", default)]
    pub cpm: f64,
    #[serde(rename = "Clics en el enlace", default)]
    pub link_clicks: i64,
    #[serde(rename = "shop_clicks", default)]
    pub shop_clicks: i64,
    #[serde(rename = "CPC (costo por clic en el enlace) (CLP)", default)]
    pub link_cpc: f64,
    #[serde(rename = "CTR (porcentaje de clics en el enlace)", default)]
    pub link_ctr: f64,
    #[serde(rename = "Clics (todos)", default)]
    pub clicks: i64,
    #[serde(rename = "CTR (todos)", default)]
    pub ctr: f64,
    #[serde(rename = "CPC (todos) (CLP)", default)]
    pub cpc: f64,
}

impl CampaignRow {
    /// Report columns in display order
    pub const COLUMNS: [&'static str; 25] = [
        "ID Campaña",
        "Inicio del informe",
        "Fin del informe",
        "Nombre de la campaña",
        "Objective",
        "Entrega de la campaña",
        "Resultados",
        "Indicador de resultado",
        "Indicador de resultado _REAL",
        "Alcance",
        "Frecuencia",
        "Costo por resultados (CLP)",
        "Presupuesto del conjunto de anuncios",
        "Tipo de presupuesto del conjunto de anuncios",
        "Importe gastado (CLP)",
        "Finalización",
        "Impresiones",
        "CPM (costo por mil impresiones) (CLP)",
        "Clics en el enlace",
        "shop_clicks",
        "CPC (costo por clic en el enlace) (CLP)",
        "CTR (porcentaje de clics en el enlace)",
        "Clics (todos)",
        "CTR (todos)",
        "CPC (todos) (CLP)",
    ];

    /// Build the report row for a campaign from its insight record
    pub fn from_insight(
        campaign: &Campaign,
        insight: &Insight,
        report_start: NaiveDate,
        report_end: NaiveDate,
    ) -> Self {
        let parsed = parse_results(&campaign.name, Some(insight));

        let daily_budget = campaign.daily_budget.as_deref().filter(|b| !b.is_empty());
        let (budget_type, budget_minor_units) = match daily_budget {
            Some(daily) => ("Diario", daily),
            None => ("Total", campaign.lifetime_budget.as_deref().unwrap_or("0")),
        };
        let budget = budget_minor_units.trim().parse::<f64>().unwrap_or(0.0) / 100.0;

        Self {
            campaign_id: campaign.id.clone(),
            report_start,
            report_end,
            campaign_name: campaign.name.clone(),
            objective: campaign.objective.clone(),
            effective_status: campaign.effective_status.clone(),
            results: parsed.count,
            result_indicator: parsed.indicator,
            real_indicator: parsed.real_indicator,
            reach: insight.reach as i64,
            frequency: insight.frequency,
            cost_per_result: parsed.cost_per_result,
            budget,
            budget_type: budget_type.to_string(),
            spend: insight.spend,
            stop_time: campaign
                .stop_time
                .clone()
                .unwrap_or_else(|| "Abierta".to_string()),
            impressions: insight.impressions as i64,
            cpm: insight.cpm,
            link_clicks: insight.inline_link_clicks as i64,
            shop_clicks: insight.action_count("shop_clicks").unwrap_or(0),
            link_cpc: insight.cost_per_inline_link_click,
            link_ctr: insight.inline_link_click_ctr,
            clicks: insight.clicks as i64,
            ctr: insight.ctr,
            cpc: insight.cpc,
        }
    }

    /// Cell values in [`Self::COLUMNS`] order
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.campaign_id.clone(),
            self.report_start.format("%Y-%m-%d").to_string(),
            self.report_end.format("%Y-%m-%d").to_string(),
            self.campaign_name.clone(),
            self.objective.clone().unwrap_or_default(),
            self.effective_status.clone().unwrap_or_default(),
            self.results.to_string(),
            self.result_indicator.clone(),
            self.real_indicator.clone(),
            self.reach.to_string(),
            format_decimal(self.frequency),
            format_decimal(self.cost_per_result),
            format_decimal(self.budget),
            self.budget_type.clone(),
            format_decimal(self.spend),
            self.stop_time.clone(),
            self.impressions.to_string(),
            format_decimal(self.cpm),
            self.link_clicks.to_string(),
            self.shop_clicks.to_string(),
            format_decimal(self.link_cpc),
            format_decimal(self.link_ctr),
            self.clicks.to_string(),
            format_decimal(self.ctr),
            format_decimal(self.cpc),
        ]
    }
}

fn format_decimal(value: f64) -> String {
    let text = format!("{value:.6}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
