/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use allocative::Allocative;
use anyhow::Context;
use itertools::Itertools;
use quarry_core::configuration::config_setting::ConfigSettingData;
use quarry_core::configuration::data::ConfigurationData;
use quarry_core::target::label::TargetLabel;
use starlark_map::small_set::SmallSet;
use static_assertions::assert_eq_size;

use crate::attrs::configuration_context::AttrConfigurationContext;
use crate::attrs::configured_attr::ConfiguredAttr;

#[derive(Debug, thiserror::Error)]
enum SelectError {
    #[error(
        "None of {} conditions matched configuration `{0}` and no default was set:\n{}",
        .1.len(),
        .1.iter().map(|s| format!("  {}", s)).join("\n"),
    )]
    MissingDefault(ConfigurationData, Vec<TargetLabel>),
    #[error(
        "Both select keys `{0}` and `{1}` match the configuration, but neither is more specific"
    )]
    TwoKeysDoNotRefineEachOther(String, String),
    #[error("duplicate key `{0}` in `select()`")]
    DuplicateKey(String),
}

/// An attribute value as written in the build description, before
/// configuration. `select` branches are unresolved.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Allocative)]
pub enum CoercedAttr {
    None,
    String(Arc<str>),
    Dep(TargetLabel),
    List(Box<[CoercedAttr]>),
    Selector(Box<CoercedSelector>),
}

// This type is stored on every attribute of every node, so keep it small.
assert_eq_size!(CoercedAttr, [usize; 3]);

#[derive(Debug, Clone, Eq, PartialEq, Hash, Allocative)]
pub struct CoercedSelector {
    pub entries: Box<[(TargetLabel, CoercedAttr)]>,
    pub default: Option<CoercedAttr>,
}

impl CoercedSelector {
    pub fn new(
        entries: Box<[(TargetLabel, CoercedAttr)]>,
        default: Option<CoercedAttr>,
    ) -> anyhow::Result<CoercedSelector> {
        Self::check_all_keys_unique(&entries)?;
        Ok(CoercedSelector { entries, default })
    }

    fn check_all_keys_unique(entries: &[(TargetLabel, CoercedAttr)]) -> anyhow::Result<()> {
        let mut seen = SmallSet::with_capacity(entries.len());
        for (k, _) in entries {
            if !seen.insert(k) {
                return Err(SelectError::DuplicateKey(k.to_string()).into());
            }
        }
        Ok(())
    }
}

impl CoercedAttr {
    /// Resolve the attribute against a configuration. Select branches are
    /// keyed by `config_setting` targets; the branch whose setting matches
    /// and refines all other matching settings wins, else the default.
    pub fn configure(&self, ctx: &dyn AttrConfigurationContext) -> anyhow::Result<ConfiguredAttr> {
        Ok(match self {
            CoercedAttr::None => ConfiguredAttr::None,
            CoercedAttr::String(v) => ConfiguredAttr::String(v.clone()),
            CoercedAttr::Dep(d) => ConfiguredAttr::Dep(d.clone()),
            CoercedAttr::List(list) => ConfiguredAttr::List(
                list.iter()
                    .map(|v| v.configure(ctx))
                    .collect::<anyhow::Result<_>>()?,
            ),
            CoercedAttr::Selector(select) => {
                let CoercedSelector { entries, default } = &**select;
                if let Some(v) = Self::select_the_most_specific(ctx, entries)? {
                    v.configure(ctx)?
                } else if let Some(default) = default {
                    default.configure(ctx)?
                } else {
                    return Err(SelectError::MissingDefault(
                        ctx.cfg().clone(),
                        entries.iter().map(|(k, _)| k.clone()).collect(),
                    )
                    .into());
                }
            }
        })
    }

    fn select_the_most_specific<'a>(
        ctx: &dyn AttrConfigurationContext,
        select_entries: &'a [(TargetLabel, CoercedAttr)],
    ) -> anyhow::Result<Option<&'a CoercedAttr>> {
        let mut matching: Option<(&TargetLabel, &ConfigSettingData, &CoercedAttr)> = None;
        for (k, v) in select_entries {
            let Some(setting) = ctx.matched_setting(k)? else {
                continue;
            };
            matching = Some(match matching {
                None => (k, setting, v),
                Some(prev @ (prev_k, prev_setting, _)) => {
                    if setting.refines(prev_setting) {
                        (k, setting, v)
                    } else if prev_setting.refines(setting) {
                        prev
                    } else {
                        return Err(SelectError::TwoKeysDoNotRefineEachOther(
                            prev_k.to_string(),
                            k.to_string(),
                        )
                        .into());
                    }
                }
            });
        }
        Ok(matching.map(|(_, _, v)| v))
    }
}

impl CoercedAttr {
    /// Parse a simple test notation: `"..."` strings, `//...:...` deps, and
    /// nothing else. For tests.
    pub fn testing_dep(label: &str) -> CoercedAttr {
        CoercedAttr::Dep(TargetLabel::testing_parse(label))
    }

    pub fn testing_string(value: &str) -> CoercedAttr {
        CoercedAttr::String(Arc::from(value))
    }

    pub fn testing_select(
        entries: &[(&str, CoercedAttr)],
        default: Option<CoercedAttr>,
    ) -> CoercedAttr {
        CoercedAttr::Selector(Box::new(
            CoercedSelector::new(
                entries
                    .iter()
                    .map(|(k, v)| (TargetLabel::testing_parse(k), v.clone()))
                    .collect(),
                default,
            )
            .context("invalid select in test")
            .unwrap(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use quarry_core::configuration::config_setting::ConfigSettingData;
    use quarry_core::configuration::data::ConfigurationData;
    use quarry_core::target::label::TargetLabel;

    use crate::attrs::coerced_attr::CoercedAttr;
    use crate::attrs::coerced_attr::CoercedSelector;
    use crate::attrs::configuration_context::AttrConfigurationContext;
    use crate::attrs::configured_attr::ConfiguredAttr;

    struct TestCtx {
        cfg: ConfigurationData,
        settings: Vec<(TargetLabel, ConfigSettingData)>,
    }

    impl AttrConfigurationContext for TestCtx {
        fn cfg(&self) -> &ConfigurationData {
            &self.cfg
        }

        fn matched_setting(
            &self,
            label: &TargetLabel,
        ) -> anyhow::Result<Option<&ConfigSettingData>> {
            Ok(self
                .settings
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, s)| s)
                .filter(|s| self.cfg.matches(s)))
        }
    }

    fn linux_ctx() -> TestCtx {
        TestCtx {
            cfg: ConfigurationData::testing_new("linux-arm64", &[
                ("//os:os", "linux"),
                ("//cpu:cpu", "arm64"),
            ]),
            settings: vec![
                (
                    TargetLabel::testing_parse("//c:linux"),
                    ConfigSettingData::testing_new(&[("//os:os", "linux")]),
                ),
                (
                    TargetLabel::testing_parse("//c:macos"),
                    ConfigSettingData::testing_new(&[("//os:os", "macos")]),
                ),
                (
                    TargetLabel::testing_parse("//c:linux-arm64"),
                    ConfigSettingData::testing_new(&[
                        ("//os:os", "linux"),
                        ("//cpu:cpu", "arm64"),
                    ]),
                ),
                (
                    TargetLabel::testing_parse("//c:arm64"),
                    ConfigSettingData::testing_new(&[("//cpu:cpu", "arm64")]),
                ),
            ],
        }
    }

    #[test]
    fn configure_picks_matching_branch() {
        let attr = CoercedAttr::testing_select(
            &[
                ("//c:macos", CoercedAttr::testing_string("m")),
                ("//c:linux", CoercedAttr::testing_string("l")),
            ],
            Some(CoercedAttr::testing_string("d")),
        );
        assert_eq!(
            ConfiguredAttr::String("l".into()),
            attr.configure(&linux_ctx()).unwrap()
        );
    }

    #[test]
    fn configure_falls_back_to_default() {
        let attr = CoercedAttr::testing_select(
            &[("//c:macos", CoercedAttr::testing_string("m"))],
            Some(CoercedAttr::testing_string("d")),
        );
        assert_eq!(
            ConfiguredAttr::String("d".into()),
            attr.configure(&linux_ctx()).unwrap()
        );
    }

    #[test]
    fn configure_missing_default_is_an_error() {
        let attr =
            CoercedAttr::testing_select(&[("//c:macos", CoercedAttr::testing_string("m"))], None);
        let err = attr.configure(&linux_ctx()).unwrap_err();
        assert!(err.to_string().contains("no default was set"), "{}", err);
    }

    #[test]
    fn configure_picks_the_most_specific_branch() {
        let attr = CoercedAttr::testing_select(
            &[
                ("//c:linux", CoercedAttr::testing_string("l")),
                ("//c:linux-arm64", CoercedAttr::testing_string("la")),
            ],
            None,
        );
        assert_eq!(
            ConfiguredAttr::String("la".into()),
            attr.configure(&linux_ctx()).unwrap()
        );
    }

    #[test]
    fn configure_ambiguous_branches_are_an_error() {
        let attr = CoercedAttr::testing_select(
            &[
                ("//c:linux", CoercedAttr::testing_string("l")),
                ("//c:arm64", CoercedAttr::testing_string("a")),
            ],
            None,
        );
        let err = attr.configure(&linux_ctx()).unwrap_err();
        assert!(
            err.to_string().contains("neither is more specific"),
            "{}",
            err
        );
    }

    #[test]
    fn duplicate_select_keys_are_rejected() {
        let e = CoercedSelector::new(
            Box::new([
                (
                    TargetLabel::testing_parse("//c:linux"),
                    CoercedAttr::testing_string("a"),
                ),
                (
                    TargetLabel::testing_parse("//c:linux"),
                    CoercedAttr::testing_string("b"),
                ),
            ]),
            None,
        );
        assert!(e.is_err());
    }
}
