use crate::model::TestType;

/// Keys the service is required to emit. The parser's structured tier
/// decodes exactly this shape.
pub const RESULT_KEYS: [&str; 5] = [
    "predicted_level",
    "confidence",
    "explanation",
    "tube_description",
    "matched_reference",
];

/// Build the instruction text for one analysis call. Pure function of
/// (test_type, unit); identical inputs always produce identical text.
pub fn build_prompt(test_type: TestType, unit: &str) -> String {
    let name = test_type.display_name();
    let color = test_type.color_family();
    let levels = levels_clause(test_type);

    let unit_suffix = if test_type.uses_unit() {
        format!(" {unit}")
    } else {
        String::new()
    };

    let chart_fallback = match test_type {
        TestType::Ph => "the pH liquid color generally ranges from yellow (acidic) through green \
                         (neutral) to blue (alkaline)"
            .to_string(),
        _ => format!(
            "the {} liquid shows a {} color whose intensity deepens as the level rises",
            name.to_lowercase(),
            color
        ),
    };

    format!(
        "You are an expert at reading aquarium water test kits. Analyze this {name} test kit photo.\n\
         \n\
         The photo shows a test tube with colored liquid; a printed reference color chart may or \
         may not be visible next to it.\n\
         \n\
         1. Locate the test tube (a clear tube holding {color} liquid).\n\
         2. Compare the liquid color to the reference chart if one is visible. If no chart is \
         present, note that {chart_fallback}.\n\
         3. Decide which reference level {levels}{unit_suffix} best matches the tube liquid.\n\
         4. Give a confidence from 0 to 100 for the match.\n\
         \n\
         Respond with ONLY a JSON object of this exact shape:\n\
         {{\n\
             \"predicted_level\": <number>,\n\
             \"confidence\": <number 0-100>,\n\
             \"explanation\": \"<what you observed>\",\n\
             \"tube_description\": \"<color of the tube liquid>\",\n\
             \"matched_reference\": \"<the matching reference block>\"\n\
         }}\n\
         \n\
         Be precise in the color comparison; weigh the tube liquid against each reference block."
    )
}

/// "(0.0, 0.5, 1.0, 3.0 or 5.0)"
fn levels_clause(test_type: TestType) -> String {
    let rendered: Vec<String> = test_type
        .reference_levels()
        .iter()
        .map(|l| format!("{l:.1}"))
        .collect();
    let (last, rest) = rendered.split_last().expect("every test type has levels");
    format!("({} or {})", rest.join(", "), last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_enumerates_the_reference_levels() {
        for t in TestType::ALL {
            let prompt = build_prompt(t, "mg/L");
            for level in t.reference_levels() {
                assert!(
                    prompt.contains(&format!("{level:.1}")),
                    "{t} prompt missing level {level}"
                );
            }
        }
    }

    #[test]
    fn prompt_mandates_the_result_keys() {
        for t in TestType::ALL {
            let prompt = build_prompt(t, "ppm");
            for key in RESULT_KEYS {
                assert!(prompt.contains(key), "{t} prompt missing key {key}");
            }
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(
            build_prompt(TestType::Nitrite, "mg/L"),
            build_prompt(TestType::Nitrite, "mg/L")
        );
    }

    #[test]
    fn unit_appears_only_for_unit_bearing_tests() {
        assert!(build_prompt(TestType::Ammonia, "mg/L").contains("5.0) mg/L"));
        assert!(!build_prompt(TestType::Ph, "mg/L").contains("mg/L"));
    }

    #[test]
    fn prompt_mentions_the_color_family_and_chart_absence() {
        let prompt = build_prompt(TestType::Nitrite, "mg/L");
        assert!(prompt.contains("pink"));
        assert!(prompt.contains("If no chart is present"));
    }
}
