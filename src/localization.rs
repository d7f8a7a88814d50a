use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{error, warn};
use unic_langid::LanguageIdentifier;

/// Languages with a bundled resource, the first one is the fallback
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["uz", "ru"];

const UZ_RESOURCE: &str = include_str!("../locales/uz/main.ftl");
const RU_RESOURCE: &str = include_str!("../locales/ru/main.ftl");

/// Localization manager for the shop bot
pub struct LocalizationManager {
    bundles: HashMap<&'static str, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every supported language loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (code, source) in [("uz", UZ_RESOURCE), ("ru", RU_RESOURCE)] {
            let locale: LanguageIdentifier = code.parse()?;
            bundles.insert(code, Self::create_bundle(locale, source)?);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(
        locale: LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Telegram shows the Unicode isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("failed to parse {locale} resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("failed to add {locale} resource: {errors:?}"))?;

        Ok(bundle)
    }

    /// Get a localized message in a specific language
    ///
    /// Unknown languages fall back to Uzbek; missing keys are returned as-is.
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let language = detect_language(Some(language));
        let Some(bundle) = self.bundles.get(language) else {
            return key.to_string();
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            warn!(key, language, "Missing translation");
            return key.to_string();
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(value.to_string()));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, language, ?errors, "Errors while formatting message");
        }
        value.into_owned()
    }

    pub fn has_message(&self, key: &str, language: &str) -> bool {
        self.bundles
            .get(language)
            .is_some_and(|bundle| bundle.has_message(key))
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager
pub fn init_localization() -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_none() {
        let manager = LocalizationManager::new()?;
        let _ = LOCALIZATION_MANAGER.set(manager);
    }
    Ok(())
}

/// Get the global localization manager, loading it on first use
pub fn get_localization_manager() -> Option<&'static LocalizationManager> {
    if let Some(manager) = LOCALIZATION_MANAGER.get() {
        return Some(manager);
    }
    match LocalizationManager::new() {
        Ok(manager) => Some(LOCALIZATION_MANAGER.get_or_init(|| manager)),
        Err(e) => {
            error!(error = %e, "Failed to load localization resources");
            None
        }
    }
}

/// Map a Telegram `language_code` (e.g. `ru-RU`) to a supported language
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let primary = language_code
        .and_then(|code| code.split(['-', '_']).next())
        .map(str::to_ascii_lowercase);

    SUPPORTED_LANGUAGES
        .into_iter()
        .find(|supported| primary.as_deref() == Some(*supported))
        .unwrap_or(SUPPORTED_LANGUAGES[0])
}

/// Get a localized message in a specific language
pub fn t_lang(key: &str, language: Option<&str>) -> String {
    t_args_lang(key, &[], language)
}

/// Get a localized message with arguments in a specific language
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language: Option<&str>) -> String {
    let Some(manager) = get_localization_manager() else {
        return key.to_string();
    };
    let language = detect_language(language);

    if args.is_empty() {
        manager.get_message_in_language(key, language, None)
    } else {
        let args_map: HashMap<&str, &str> = args.iter().copied().collect();
        manager.get_message_in_language(key, language, Some(&args_map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(Some("ru")), "ru");
        assert_eq!(detect_language(Some("ru-RU")), "ru");
        assert_eq!(detect_language(Some("UZ")), "uz");
        assert_eq!(detect_language(Some("en")), "uz");
        assert_eq!(detect_language(None), "uz");
    }

    #[test]
    fn test_bundles_share_the_same_keys() {
        let manager = LocalizationManager::new().unwrap();
        let keys = |source: &str| -> Vec<String> {
            source
                .lines()
                .filter(|line| !line.starts_with([' ', '#']) && line.contains(" ="))
                .filter_map(|line| line.split(" =").next().map(str::to_string))
                .collect()
        };

        let uz_keys = keys(UZ_RESOURCE);
        assert!(!uz_keys.is_empty());
        assert_eq!(uz_keys, keys(RU_RESOURCE));
        for key in &uz_keys {
            assert!(manager.has_message(key, "uz"), "uz is missing {key}");
            assert!(manager.has_message(key, "ru"), "ru is missing {key}");
        }
    }

    #[test]
    fn test_arguments_are_not_isolated() {
        let text = t_args_lang("registration-complete", &[("name", "Ali")], Some("uz"));
        assert!(text.ends_with("Xush kelibsiz, Ali!"));
        assert!(!text.contains('\u{2068}'));
    }

    #[test]
    fn test_missing_key_falls_back_to_key() {
        assert_eq!(t_lang("no-such-key", Some("ru")), "no-such-key");
    }
}
