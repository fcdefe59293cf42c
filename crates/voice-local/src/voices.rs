//! Ranking of platform voices against a target profile.
//!
//! Voice catalogs differ per OS and browser, so the ranking never fails while
//! at least one voice exists. Rules are tried in order, first hit wins:
//! 1. a curated voice name for the profile's language and gender
//! 2. a voice in the profile's language not guessed as the opposite gender
//! 3. any voice in the profile's language
//! 4. the first voice the platform lists

use crate::{VoiceGender, VoiceInfo, VoiceListing, VoiceProfile};

const MASCULINE_PT: &[&str] = &[
    "Microsoft Daniel",
    "Microsoft Helio",
    "Daniel",
    "Helio",
    "Ricardo",
    "João",
    "Carlos",
    "Bruno",
    "Paulo",
    "Google português do Brasil (male)",
    "Google português do Brasil masculino",
];

const FEMININE_PT: &[&str] = &[
    "Microsoft Maria",
    "Microsoft Francisca",
    "Luciana",
    "Fernanda",
    "Maria",
    "Google português do Brasil",
];

const MASCULINE_EN: &[&str] = &["Google US English Male", "Microsoft David", "Microsoft Mark", "Alex"];

const FEMININE_EN: &[&str] = &["Microsoft Zira", "Samantha", "Karen", "Google US English"];

const FEMININE_INDICATORS: &[&str] = &[
    "maria", "ana", "fernanda", "luciana", "francisca", "sofia", "female", "feminino",
];

const MASCULINE_INDICATORS: &[&str] = &[
    "daniel", "joão", "carlos", "bruno", "paulo", "ricardo", "helio", "male", "masculino",
];

/// Which ranking rule picked a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    CuratedName,
    LanguageAndGender,
    Language,
    FirstAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceMatch<'a> {
    pub voice: &'a VoiceInfo,
    pub rule: MatchRule,
}

/// Guess a voice's gender from its display name.
pub fn guess_voice_gender(name: &str) -> VoiceGender {
    let name = name.to_lowercase();
    // Feminine first: "female" contains "male"
    if FEMININE_INDICATORS.iter().any(|n| name.contains(n)) {
        return VoiceGender::Feminine;
    }
    if MASCULINE_INDICATORS.iter().any(|n| name.contains(n)) {
        return VoiceGender::Masculine;
    }
    VoiceGender::Unknown
}

/// `pt_BR`, `pt-br` and `pt-BR` all match a `pt-BR` target; `pt` matches any
/// Portuguese voice.
pub fn language_matches(voice_language: &str, target: &str) -> bool {
    normalize_tag(voice_language).starts_with(&normalize_tag(target))
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_lowercase()
}

fn primary_subtag(tag: &str) -> String {
    normalize_tag(tag)
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn curated_names(language: &str, gender: VoiceGender) -> &'static [&'static str] {
    match (primary_subtag(language).as_str(), gender) {
        ("pt", VoiceGender::Masculine) => MASCULINE_PT,
        ("pt", VoiceGender::Feminine) => FEMININE_PT,
        ("en", VoiceGender::Masculine) => MASCULINE_EN,
        ("en", VoiceGender::Feminine) => FEMININE_EN,
        _ => &[],
    }
}

fn opposite(gender: VoiceGender) -> Option<VoiceGender> {
    match gender {
        VoiceGender::Masculine => Some(VoiceGender::Feminine),
        VoiceGender::Feminine => Some(VoiceGender::Masculine),
        VoiceGender::Unknown => None,
    }
}

/// Pick the best voice for `profile`. `None` only when `voices` is empty.
pub fn best_voice<'a>(voices: &'a [VoiceInfo], profile: &VoiceProfile) -> Option<VoiceMatch<'a>> {
    // Curated names are ordered by preference, so the outer loop runs over them
    for wanted in curated_names(&profile.language, profile.gender) {
        let wanted = wanted.to_lowercase();
        if let Some(voice) = voices
            .iter()
            .find(|v| v.name.to_lowercase().contains(&wanted))
        {
            return Some(VoiceMatch {
                voice,
                rule: MatchRule::CuratedName,
            });
        }
    }

    if let Some(avoid) = opposite(profile.gender) {
        if let Some(voice) = voices.iter().find(|v| {
            language_matches(&v.language, &profile.language) && guess_voice_gender(&v.name) != avoid
        }) {
            return Some(VoiceMatch {
                voice,
                rule: MatchRule::LanguageAndGender,
            });
        }
    }

    if let Some(voice) = voices
        .iter()
        .find(|v| language_matches(&v.language, &profile.language))
    {
        return Some(VoiceMatch {
            voice,
            rule: MatchRule::Language,
        });
    }

    voices.first().map(|voice| VoiceMatch {
        voice,
        rule: MatchRule::FirstAvailable,
    })
}

/// Voices sharing the primary language of `language`, in platform order.
pub fn voices_for_language(voices: &[VoiceInfo], language: &str) -> Vec<VoiceListing> {
    let primary = primary_subtag(language);
    voices
        .iter()
        .filter(|v| language_matches(&v.language, &primary))
        .map(|v| VoiceListing {
            voice: v.clone(),
            gender: guess_voice_gender(&v.name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, language: &str) -> VoiceInfo {
        VoiceInfo::new(name.to_lowercase().replace(' ', "-"), name, language)
    }

    #[test]
    fn test_guess_gender() {
        assert_eq!(guess_voice_gender("Microsoft Daniel - Portuguese (Brazil)"), VoiceGender::Masculine);
        assert_eq!(guess_voice_gender("Luciana"), VoiceGender::Feminine);
        assert_eq!(guess_voice_gender("Google UK English Female"), VoiceGender::Feminine);
        assert_eq!(guess_voice_gender("Google UK English Male"), VoiceGender::Masculine);
        assert_eq!(guess_voice_gender("Google português do Brasil"), VoiceGender::Unknown);
    }

    #[test]
    fn test_language_matching_normalizes_tags() {
        assert!(language_matches("pt_BR", "pt-BR"));
        assert!(language_matches("PT-br", "pt-BR"));
        assert!(language_matches("pt-PT", "pt"));
        assert!(!language_matches("pt-PT", "pt-BR"));
        assert!(!language_matches("en-US", "pt-BR"));
    }

    #[test]
    fn test_curated_name_wins_over_language_order() {
        let voices = vec![
            voice("Luciana", "pt-BR"),
            voice("Google português do Brasil", "pt-BR"),
            voice("Microsoft Daniel - Portuguese (Brazil)", "pt-BR"),
        ];
        let m = best_voice(&voices, &VoiceProfile::default()).unwrap();
        assert_eq!(m.rule, MatchRule::CuratedName);
        assert_eq!(m.voice.name, "Microsoft Daniel - Portuguese (Brazil)");
    }

    #[test]
    fn test_curated_list_order_is_preference_order() {
        let voices = vec![voice("Paulo", "pt-BR"), voice("Helio", "pt-BR")];
        let m = best_voice(&voices, &VoiceProfile::default()).unwrap();
        assert_eq!(m.voice.name, "Helio");
    }

    #[test]
    fn test_non_feminine_voice_in_language() {
        let voices = vec![
            voice("Samantha", "en-US"),
            voice("Fernanda Neural", "pt-BR"),
            voice("Voz Robótica", "pt_BR"),
        ];
        let m = best_voice(&voices, &VoiceProfile::default()).unwrap();
        assert_eq!(m.rule, MatchRule::LanguageAndGender);
        assert_eq!(m.voice.name, "Voz Robótica");
    }

    #[test]
    fn test_any_voice_in_language() {
        let voices = vec![voice("Samantha", "en-US"), voice("Fernanda Neural", "pt-BR")];
        let m = best_voice(&voices, &VoiceProfile::default()).unwrap();
        assert_eq!(m.rule, MatchRule::Language);
        assert_eq!(m.voice.name, "Fernanda Neural");
    }

    #[test]
    fn test_first_available_fallback_and_empty_list() {
        let voices = vec![voice("Samantha", "en-US"), voice("Thomas", "fr-FR")];
        let m = best_voice(&voices, &VoiceProfile::default()).unwrap();
        assert_eq!(m.rule, MatchRule::FirstAvailable);
        assert_eq!(m.voice.name, "Samantha");

        assert!(best_voice(&[], &VoiceProfile::default()).is_none());
    }

    #[test]
    fn test_feminine_profile() {
        let voices = vec![voice("Daniel", "pt-BR"), voice("Voz Neutra", "pt-BR")];
        let profile = VoiceProfile {
            language: "pt-BR".to_string(),
            gender: VoiceGender::Feminine,
        };
        let m = best_voice(&voices, &profile).unwrap();
        assert_eq!(m.rule, MatchRule::LanguageAndGender);
        assert_eq!(m.voice.name, "Voz Neutra");
    }

    #[test]
    fn test_voices_for_language_filters_by_primary_subtag() {
        let voices = vec![
            voice("Daniel", "pt-BR"),
            voice("Joana", "pt-PT"),
            voice("Samantha", "en-US"),
        ];
        let listed = voices_for_language(&voices, "pt-BR");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].gender, VoiceGender::Masculine);
        assert_eq!(listed[1].voice.name, "Joana");
        assert_eq!(listed[1].gender, VoiceGender::Feminine);
    }
}
