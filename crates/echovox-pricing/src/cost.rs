//! Pure cost computation from per-response usage metadata.

use crate::table::pricing_for;
use echovox_protocol::{Modality, TokenDetail, UsageMetadata};
use serde::Serialize;

/// Cost of one response, split by direction, with the token counts that
/// produced it. Recomputed fresh per response; the session total is the
/// caller's running sum of `total_cost`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub input_text_tokens: u64,
    pub input_audio_tokens: u64,
    pub output_text_tokens: u64,
    pub output_audio_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

fn sum_by_modality(details: &[TokenDetail]) -> (u64, u64) {
    let mut text = 0u64;
    let mut audio = 0u64;
    for detail in details {
        match detail.modality {
            Modality::Text => text += detail.token_count as u64,
            Modality::Audio => audio += detail.token_count as u64,
            // Unknown modalities are not billed until the table learns them.
            Modality::Unspecified => {}
        }
    }
    (text, audio)
}

/// Price one response's usage against the model's rate card.
///
/// Deterministic and side-effect free; unknown model ids degrade to the
/// default model's prices rather than failing.
pub fn compute_cost(model_id: &str, usage: &UsageMetadata) -> CostBreakdown {
    let pricing = pricing_for(model_id);

    let (input_text_tokens, input_audio_tokens) = sum_by_modality(&usage.prompt_tokens_details);
    let (output_text_tokens, output_audio_tokens) =
        sum_by_modality(&usage.response_tokens_details);

    let input_cost = input_text_tokens as f64 * pricing.input.text
        + input_audio_tokens as f64 * pricing.input.audio;
    let output_cost = output_text_tokens as f64 * pricing.output.text
        + output_audio_tokens as f64 * pricing.output.audio;

    CostBreakdown {
        input_text_tokens,
        input_audio_tokens,
        output_text_tokens,
        output_audio_tokens,
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DEFAULT_MODEL;

    fn usage(prompt: &[(Modality, u32)], response: &[(Modality, u32)]) -> UsageMetadata {
        UsageMetadata {
            prompt_tokens_details: prompt
                .iter()
                .map(|&(modality, token_count)| TokenDetail {
                    modality,
                    token_count,
                })
                .collect(),
            response_tokens_details: response
                .iter()
                .map(|&(modality, token_count)| TokenDetail {
                    modality,
                    token_count,
                })
                .collect(),
        }
    }

    #[test]
    fn total_is_input_plus_output() {
        let u = usage(
            &[(Modality::Text, 25), (Modality::Audio, 1500)],
            &[(Modality::Audio, 900), (Modality::Text, 40)],
        );
        let breakdown = compute_cost(DEFAULT_MODEL, &u);
        assert!(breakdown.input_cost > 0.0);
        assert!(breakdown.output_cost > 0.0);
        assert_eq!(
            breakdown.total_cost,
            breakdown.input_cost + breakdown.output_cost
        );
    }

    #[test]
    fn empty_usage_costs_nothing() {
        let breakdown = compute_cost(DEFAULT_MODEL, &UsageMetadata::default());
        assert_eq!(breakdown, CostBreakdown::default());
    }

    #[test]
    fn unknown_model_uses_default_rates() {
        let u = usage(&[(Modality::Audio, 1000)], &[(Modality::Audio, 1000)]);
        let known = compute_cost(DEFAULT_MODEL, &u);
        let unknown = compute_cost("gemini-9.9-hypothetical", &u);
        assert_eq!(known, unknown);
    }

    #[test]
    fn unrecognized_modality_is_ignored() {
        let with_extra = usage(
            &[(Modality::Text, 100), (Modality::Unspecified, 9999)],
            &[],
        );
        let without = usage(&[(Modality::Text, 100)], &[]);
        assert_eq!(
            compute_cost(DEFAULT_MODEL, &with_extra),
            compute_cost(DEFAULT_MODEL, &without)
        );
    }

    #[test]
    fn cost_is_monotonic_in_token_counts() {
        let small = usage(&[(Modality::Audio, 100)], &[(Modality::Audio, 100)]);
        let large = usage(&[(Modality::Audio, 200)], &[(Modality::Audio, 350)]);
        let a = compute_cost(DEFAULT_MODEL, &small);
        let b = compute_cost(DEFAULT_MODEL, &large);
        assert!(b.input_cost > a.input_cost);
        assert!(b.output_cost > a.output_cost);
        assert!(b.total_cost > a.total_cost);
    }

    #[test]
    fn repeated_detail_entries_accumulate() {
        let u = usage(
            &[(Modality::Text, 10), (Modality::Text, 15)],
            &[],
        );
        let breakdown = compute_cost(DEFAULT_MODEL, &u);
        assert_eq!(breakdown.input_text_tokens, 25);
    }
}
