//! Similarity-based booking recommendations.
//!
//! The score is an additive heuristic over location, party size, nightly
//! price, and stay length. Higher is better; candidates are ranked by
//! descending score with ties keeping input order.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::booking::Booking;

/// Substituted when the external explanation generator fails or is disabled.
pub const FALLBACK_EXPLANATION: &str = "Recommendations are based on similar location, guests, \
                                        nights, and price. (AI explanation unavailable right now.)";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredBooking {
    pub booking: Booking,
    pub score: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Recommendation {
    pub base: Booking,
    pub matches: Vec<ScoredBooking>,
    pub explanation: String,
}

fn eq_ignore_case_trimmed(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}

/// Score a candidate against the base booking.
///
/// - +40 when regions match case-insensitively, +30 for countries.
/// - Guest closeness: `max(0, 20 - 4*|diff|)`, skipped when either side has
///   no guest count.
/// - Price closeness: `max(0, 20 - floor(|diff| / 10))`.
/// - Stay length: `max(0, 10 - |diff|)`.
pub fn similarity_score(base: &Booking, other: &Booking) -> i64 {
    let mut score = 0i64;

    if eq_ignore_case_trimmed(&base.region, &other.region) {
        score += 40;
    }
    if eq_ignore_case_trimmed(&base.country, &other.country) {
        score += 30;
    }

    if let (Some(base_guests), Some(other_guests)) = (base.number_of_guests, other.number_of_guests)
    {
        let diff = i64::from((base_guests - other_guests).abs());
        score += (20 - diff * 4).max(0);
    }

    let price_diff = (base.price_per_night - other.price_per_night).abs();
    let price_penalty = (price_diff / Decimal::from(10)).floor().to_i64().unwrap_or(i64::MAX);
    score += (20 - price_penalty).max(0);

    let nights_diff = i64::from((base.number_of_nights - other.number_of_nights).abs());
    score += (10 - nights_diff).max(0);

    score
}

/// Rank candidates by descending score and keep the `max(1, limit)` best.
/// The sort is stable, so equal scores preserve input order.
pub fn rank(base: &Booking, candidates: Vec<Booking>, limit: usize) -> Vec<ScoredBooking> {
    let mut scored: Vec<ScoredBooking> = candidates
        .into_iter()
        .map(|booking| {
            let score = similarity_score(base, &booking);
            ScoredBooking { booking, score }
        })
        .collect();

    scored.sort_by_key(|entry| std::cmp::Reverse(entry.score));
    scored.truncate(limit.max(1));
    scored
}

/// One summary line per candidate, fed into the explanation prompt.
pub fn candidate_summary(candidates: &[ScoredBooking]) -> String {
    if candidates.is_empty() {
        return "- (none)".to_owned();
    }

    candidates
        .iter()
        .map(|entry| {
            let booking = &entry.booking;
            format!(
                "- {} | {}, {} | guests={} | pricePerNight={}",
                booking.name,
                booking.region,
                booking.country,
                booking
                    .number_of_guests
                    .map(|guests| guests.to_string())
                    .unwrap_or_else(|| "null".to_owned()),
                booking.price_per_night,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn explanation_prompt(base: &Booking, summary: &str) -> String {
    format!(
        "You are a hotel booking recommendation assistant.\n\
         \n\
         Base booking:\n\
         - name: {name}\n\
         - region: {region}\n\
         - country: {country}\n\
         - guests: {guests}\n\
         - nights: {nights}\n\
         - pricePerNight: {price}\n\
         \n\
         Candidate recommendations:\n\
         {summary}\n\
         \n\
         Task:\n\
         1) In 2-4 sentences, explain WHY these recommendations fit the base booking.\n\
         2) Keep it short and user-friendly.",
        name = base.name,
        region = base.region,
        country = base.country,
        guests = base
            .number_of_guests
            .map(|guests| guests.to_string())
            .unwrap_or_else(|| "null".to_owned()),
        nights = base.number_of_nights,
        price = base.price_per_night,
        summary = summary,
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{candidate_summary, explanation_prompt, rank, similarity_score};
    use crate::domain::booking::{Booking, NewBooking};
    use crate::domain::user::UserId;

    fn booking(
        name: &str,
        region: &str,
        country: &str,
        guests: Option<i32>,
        nights: i32,
        price_cents: i64,
    ) -> Booking {
        Booking::from_request(
            NewBooking {
                name: name.to_owned(),
                image_url: None,
                description: None,
                region: region.to_owned(),
                country: country.to_owned(),
                check_in_date: Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap(),
                check_out_date: Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap(),
                number_of_nights: nights,
                number_of_guests: guests,
                number_of_rooms: Some(1),
                max_guests: None,
                price_per_night: Decimal::new(price_cents, 2),
                tax_amount: None,
                discount_amount: None,
                payment_method: None,
            },
            UserId::new(),
            Utc::now(),
        )
    }

    #[test]
    fn worked_example_scores_120() {
        let base = booking("Base", "Douala", "Cameroon", Some(2), 3, 5000);
        let candidate = booking("Cand", "Douala", "Cameroon", Some(2), 3, 5500);
        // 40 + 30 + 20 + (20 - floor(5/10)) + 10
        assert_eq!(similarity_score(&base, &candidate), 120);
    }

    #[test]
    fn region_match_ignores_case_and_whitespace() {
        let base = booking("Base", " douala ", "CAMEROON", None, 3, 5000);
        let candidate = booking("Cand", "Douala", "cameroon", None, 3, 5000);
        // 40 + 30 + (guest skipped) + 20 + 10
        assert_eq!(similarity_score(&base, &candidate), 100);
    }

    #[test]
    fn guest_contribution_skipped_when_either_side_absent() {
        let base = booking("Base", "A", "B", Some(2), 3, 5000);
        let with_guests = booking("Cand", "X", "Y", Some(2), 3, 5000);
        let without_guests = booking("Cand", "X", "Y", None, 3, 5000);
        assert_eq!(
            similarity_score(&base, &with_guests) - similarity_score(&base, &without_guests),
            20
        );
    }

    #[test]
    fn score_is_monotonic_in_guest_closeness() {
        let base = booking("Base", "A", "B", Some(4), 3, 5000);
        let near = booking("Cand", "X", "Y", Some(5), 3, 5000);
        let far = booking("Cand", "X", "Y", Some(9), 3, 5000);
        assert!(similarity_score(&base, &near) > similarity_score(&base, &far));
    }

    #[test]
    fn score_is_monotonic_in_price_closeness() {
        let base = booking("Base", "A", "B", Some(2), 3, 5000);
        let near = booking("Cand", "X", "Y", Some(2), 3, 6000);
        let far = booking("Cand", "X", "Y", Some(2), 3, 30_000);
        assert!(similarity_score(&base, &near) > similarity_score(&base, &far));
    }

    #[test]
    fn large_price_gap_never_goes_negative() {
        let base = booking("Base", "A", "B", None, 3, 5000);
        let far = booking("Cand", "X", "Y", None, 20, 99_999_900);
        // No region/country/guest points, price and nights floored at zero.
        assert_eq!(similarity_score(&base, &far), 0);
    }

    #[test]
    fn rank_orders_descending_and_truncates() {
        let base = booking("Base", "Douala", "Cameroon", Some(2), 3, 5000);
        let best = booking("Best", "Douala", "Cameroon", Some(2), 3, 5000);
        let mid = booking("Mid", "Douala", "Nigeria", Some(2), 3, 5000);
        let worst = booking("Worst", "Lagos", "Nigeria", Some(8), 10, 90_000);

        let ranked = rank(&base, vec![worst.clone(), best.clone(), mid.clone()], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].booking.name, "Best");
        assert_eq!(ranked[1].booking.name, "Mid");
    }

    #[test]
    fn limit_zero_still_returns_one_result() {
        let base = booking("Base", "Douala", "Cameroon", Some(2), 3, 5000);
        let only = booking("Only", "Douala", "Cameroon", Some(2), 3, 5000);
        assert_eq!(rank(&base, vec![only], 0).len(), 1);
    }

    #[test]
    fn summary_renders_one_line_per_candidate() {
        let base = booking("Base", "Douala", "Cameroon", Some(2), 3, 5000);
        let ranked = rank(
            &base,
            vec![booking("Hilltop", "Douala", "Cameroon", Some(2), 3, 5500)],
            5,
        );
        let summary = candidate_summary(&ranked);
        assert_eq!(summary, "- Hilltop | Douala, Cameroon | guests=2 | pricePerNight=55.00");
        assert_eq!(candidate_summary(&[]), "- (none)");
    }

    #[test]
    fn prompt_embeds_base_attributes_and_summary() {
        let base = booking("Base", "Douala", "Cameroon", Some(2), 3, 5000);
        let prompt = explanation_prompt(&base, "- (none)");
        assert!(prompt.contains("- region: Douala"));
        assert!(prompt.contains("- nights: 3"));
        assert!(prompt.contains("- (none)"));
    }
}
