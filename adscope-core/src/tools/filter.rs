use std::fmt;
use std::str::FromStr;

use crate::config::constants::campaign_types;
use crate::facebook::CampaignRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignType {
    LeadForm,
    Traffic,
    Conversion,
}

impl CampaignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadForm => campaign_types::LEAD_FORM,
            Self::Traffic => campaign_types::TRAFFIC,
            Self::Conversion => campaign_types::CONVERSION,
        }
    }
}

impl fmt::Display for CampaignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            campaign_types::LEAD_FORM => Ok(Self::LeadForm),
            campaign_types::TRAFFIC => Ok(Self::Traffic),
            campaign_types::CONVERSION => Ok(Self::Conversion),
            other => Err(format!(
                "unsupported campaign type '{other}', expected one of: lead_form, traffic, conversion"
            )),
        }
    }
}

/// Keep the rows that belong to `campaign_type`.
///
/// Only lead-form campaigns are fetched upstream, so traffic and conversion
/// filters always come back empty.
pub fn filter_campaigns(rows: Vec<CampaignRow>, campaign_type: CampaignType) -> Vec<CampaignRow> {
    match campaign_type {
        CampaignType::LeadForm => rows
            .into_iter()
            .filter(|row| row.campaign_name.to_lowercase().contains("lead form"))
            .collect(),
        CampaignType::Traffic | CampaignType::Conversion => Vec::new(),
    }
}
