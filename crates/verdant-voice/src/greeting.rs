//! First-greeting selection.
//!
//! The agent's opening line depends on the diagnosis the participant brought
//! into the room. Four outcomes exist and exactly one applies:
//!
//! | context  | health   | instruction                                  |
//! |----------|----------|----------------------------------------------|
//! | absent   | -        | greet and offer help                         |
//! | present  | healthy  | confirm health, give exactly two upkeep tips |
//! | present  | diseased | name the condition, give two to three steps  |
//! | present  | unknown  | explain the inconclusive scan, ask to retake |

use verdant_types::{DiagnosticContext, HealthStatus};

/// Instruction used whenever no diagnosis is available.
pub const GENERIC_GREETING: &str = "Greet the user and offer your assistance.";

/// Label spoken when a diseased diagnosis carries no class name.
const UNNAMED_CONDITION: &str = "a disease";

/// Normalizes a classifier confidence to a whole percentage.
///
/// Values up to and including 1 are fractions and get scaled by 100. Larger
/// values are already percentages and are only rounded.
pub fn confidence_percent(confidence: f64) -> i64 {
    let percent = if confidence <= 1.0 {
        confidence * 100.0
    } else {
        confidence
    };
    percent.round() as i64
}

/// Computes the instruction for the agent's first spoken reply.
pub fn compute(context: Option<&DiagnosticContext>) -> String {
    let Some(ctx) = context else {
        return GENERIC_GREETING.to_string();
    };

    let percent = confidence_percent(ctx.confidence);

    match ctx.health {
        HealthStatus::Healthy => format!(
            "Greet the farmer warmly. Tell them their cocoa plant appears healthy, \
             with {percent}% confidence. Share exactly two short tips for keeping it \
             healthy, then offer to help with anything else."
        ),
        HealthStatus::Diseased => {
            let condition = if ctx.class_name.trim().is_empty() {
                UNNAMED_CONDITION
            } else {
                ctx.class_name.trim()
            };
            format!(
                "Greet the farmer warmly. Explain that the scan detected {condition} \
                 with {percent}% confidence. Give two to three immediate, practical steps \
                 they can take to treat it, then offer to answer their questions."
            )
        }
        HealthStatus::Unknown => "Greet the farmer warmly. Explain that the plant analysis \
             was inconclusive. Ask them to retake the photo in better lighting, with a \
             single leaf or pod filling the frame, and offer to help in the meantime."
            .to_string(),
    }
}
