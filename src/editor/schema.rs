//! Per-content-type field schemas: where each kind lives, what a new record
//! looks like, which fields may be edited and how input is constrained.

use crate::collection::OrderingDomain;
use crate::core::{CmsError, Fields, Result, StorePath};
use regex::Regex;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Feature,
    Service,
    PortfolioGraphic,
    PortfolioVideo,
    PricingMonthly,
    PricingIndividual,
    Review,
}

/// Change reported on the side channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Added,
    Deleted,
    Reordered,
}

/// Input constraint applied when a field is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Free text, cut to `max_chars` characters when set
    Text { max_chars: Option<usize> },
    /// Empty, or an absolute http(s) URL
    Url,
    /// Whole number clamped into `min..=max`
    Rating { min: i64, max: i64 },
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://[^\s]+$").expect("valid url pattern"))
}

impl FieldRule {
    /// Coerce an edited value into what gets stored.
    pub fn apply(&self, field: &str, value: Value) -> Result<Value> {
        match self {
            Self::Text { max_chars } => {
                let text = match value {
                    Value::String(text) => text,
                    Value::Number(n) => n.to_string(),
                    other => {
                        return Err(CmsError::Validation(format!(
                            "'{}' expects text, got {}",
                            field, other
                        )));
                    }
                };
                Ok(Value::String(match max_chars {
                    Some(max) => text.chars().take(*max).collect(),
                    None => text,
                }))
            }
            Self::Url => {
                let Value::String(url) = value else {
                    return Err(CmsError::Validation(format!("'{}' expects a URL", field)));
                };
                let url = url.trim().to_string();
                if url.is_empty() || url_pattern().is_match(&url) {
                    Ok(Value::String(url))
                } else {
                    Err(CmsError::Validation(format!(
                        "'{}' must be an http(s) URL, got '{}'",
                        field, url
                    )))
                }
            }
            Self::Rating { min, max } => {
                let rating = match &value {
                    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| {
                    CmsError::Validation(format!("'{}' expects a number, got {}", field, value))
                })?;
                Ok(Value::from(rating.clamp(*min, *max)))
            }
        }
    }
}

const PLAIN: FieldRule = FieldRule::Text { max_chars: None };

impl ContentKind {
    pub const ALL: [ContentKind; 7] = [
        Self::Feature,
        Self::Service,
        Self::PortfolioGraphic,
        Self::PortfolioVideo,
        Self::PricingMonthly,
        Self::PricingIndividual,
        Self::Review,
    ];

    /// Section name used in alerts and the activity log.
    pub fn section(&self) -> &'static str {
        match self {
            Self::Feature => "Features",
            Self::Service => "Services",
            Self::PortfolioGraphic | Self::PortfolioVideo => "Portfolio",
            Self::PricingMonthly | Self::PricingIndividual => "Pricing",
            Self::Review => "Reviews",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Service => "service",
            Self::PortfolioGraphic => "graphic",
            Self::PortfolioVideo => "video",
            Self::PricingMonthly => "monthly plan",
            Self::PricingIndividual => "individual plan",
            Self::Review => "review",
        }
    }

    pub fn action_label(&self, action: ChangeAction) -> String {
        match action {
            ChangeAction::Added => format!("Added new {}", self.noun()),
            ChangeAction::Deleted => match self {
                Self::PortfolioGraphic | Self::PortfolioVideo => "Deleted item".to_string(),
                _ => format!("Deleted {}", self.noun()),
            },
            ChangeAction::Reordered => format!("Reordered {}s", self.noun()),
        }
    }

    pub fn delete_prompt(&self) -> String {
        match self {
            Self::PortfolioGraphic | Self::PortfolioVideo => {
                "Are you sure you want to delete this item?".to_string()
            }
            Self::PricingMonthly | Self::PricingIndividual => {
                "Are you sure you want to delete this plan?".to_string()
            }
            _ => format!("Are you sure you want to delete this {}?", self.noun()),
        }
    }

    pub fn domain(&self) -> Result<OrderingDomain> {
        let domain = match self {
            Self::Feature => OrderingDomain::new(StorePath::parse("features")?),
            Self::Service => OrderingDomain::new(StorePath::parse("services")?),
            Self::PortfolioGraphic => {
                OrderingDomain::new(StorePath::parse("portfolio")?).partitioned("type", "graphic")
            }
            Self::PortfolioVideo => {
                OrderingDomain::new(StorePath::parse("portfolio")?).partitioned("type", "video")
            }
            Self::PricingMonthly => OrderingDomain::new(StorePath::parse("pricing/monthly")?),
            Self::PricingIndividual => OrderingDomain::new(StorePath::parse("pricing/individual")?),
            Self::Review => OrderingDomain::new(StorePath::parse("reviews")?),
        };
        Ok(domain)
    }

    /// Fields of a freshly added record, without `order`. `None` when admins
    /// cannot add this kind (reviews arrive through the public form).
    pub fn add_defaults(&self) -> Option<Fields> {
        let value = match self {
            Self::Feature => json!({"name": "New Feature", "description": "Feature description"}),
            Self::Service => json!({
                "name": "New Service",
                "description": "Service description",
                "whatsappLink": "https://wa.me/",
            }),
            Self::PortfolioGraphic => json!({"title": "New Graphic", "imageUrl": "", "type": "graphic"}),
            Self::PortfolioVideo => json!({"title": "New Video", "videoUrl": "", "type": "video"}),
            Self::PricingMonthly | Self::PricingIndividual => json!({
                "title": "New Plan",
                "description": "Plan description",
                "price": "$99",
                "discount": "",
            }),
            Self::Review => return None,
        };
        value.as_object().cloned()
    }

    /// Rule for an editable field; `None` for fields that may not be edited
    /// (including `order` and the portfolio `type` discriminant).
    pub fn field_rule(&self, field: &str) -> Option<FieldRule> {
        match (self, field) {
            (Self::Feature, "name" | "description") => Some(PLAIN),
            (Self::Service, "name" | "description") => Some(PLAIN),
            (Self::Service, "whatsappLink") => Some(FieldRule::Url),
            (Self::PortfolioGraphic | Self::PortfolioVideo, "title") => Some(PLAIN),
            (Self::PortfolioGraphic, "imageUrl") => Some(FieldRule::Url),
            (Self::PortfolioVideo, "videoUrl") => Some(FieldRule::Url),
            (
                Self::PricingMonthly | Self::PricingIndividual,
                "title" | "description" | "price" | "discount",
            ) => Some(PLAIN),
            (Self::Review, "username") => Some(FieldRule::Text { max_chars: Some(50) }),
            (Self::Review, "description") => Some(FieldRule::Text { max_chars: Some(500) }),
            (Self::Review, "rating") => Some(FieldRule::Rating { min: 1, max: 5 }),
            _ => None,
        }
    }

    /// Field used as the display title of a record.
    pub fn title_field(&self) -> &'static str {
        match self {
            Self::Feature | Self::Service => "name",
            Self::Review => "username",
            _ => "title",
        }
    }

    /// How many records the public page shows.
    pub fn preview_limit(&self) -> Option<usize> {
        match self {
            Self::Feature => Some(3),
            Self::Review => Some(3),
            _ => None,
        }
    }

    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Feature => "features",
            Self::Service => "services",
            Self::PortfolioGraphic => "graphics",
            Self::PortfolioVideo => "videos",
            Self::PricingMonthly => "monthly",
            Self::PricingIndividual => "individual",
            Self::Review => "reviews",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

impl FromStr for ContentKind {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.cli_name() == s)
            .ok_or_else(|| {
                CmsError::Validation(format!(
                    "unknown collection '{}', expected one of: {}",
                    s,
                    Self::ALL.map(|k| k.cli_name()).join(", ")
                ))
            })
    }
}
