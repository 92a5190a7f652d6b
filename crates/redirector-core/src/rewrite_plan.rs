use crate::error::HostError;
use crate::host::{LinkIndex, LinkResolver, LinkTextGenerator};
use crate::link::{Document, LinkOccurrence, LinkVariant, ResolvedLinkRewrite};
use std::collections::HashMap;

/// Occurrences of one raw target written with the same source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenForm {
    /// First-seen occurrence written this way.
    pub occurrence: LinkOccurrence,
    /// Later occurrences with identical source text at other spans.
    pub duplicates: Vec<LinkOccurrence>,
}

/// Occurrences sharing one raw target after dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceGroup {
    pub target: String,
    /// Distinct source texts for the target, in first-seen order. Never empty.
    pub forms: Vec<WrittenForm>,
}

impl OccurrenceGroup {
    /// First-seen occurrence for the raw target.
    pub fn first(&self) -> &LinkOccurrence {
        &self.forms[0].occurrence
    }
}

/// Deduplicate occurrences by raw target string, first seen wins.
///
/// Later occurrences with the same target and the same source text ride along
/// as duplicates; a different source text (another alias or syntax) opens a
/// new form in the same group. Exact repeats (same span) are collapsed.
pub fn dedup_by_target(occurrences: Vec<LinkOccurrence>) -> Vec<OccurrenceGroup> {
    let mut groups: Vec<OccurrenceGroup> = Vec::new();
    let mut group_for_target: HashMap<String, usize> = HashMap::new();

    for occurrence in occurrences {
        let Some(&idx) = group_for_target.get(&occurrence.target) else {
            group_for_target.insert(occurrence.target.clone(), groups.len());
            groups.push(OccurrenceGroup {
                target: occurrence.target.clone(),
                forms: vec![WrittenForm {
                    occurrence,
                    duplicates: Vec::new(),
                }],
            });
            continue;
        };

        let group = &mut groups[idx];
        let already_seen = group.forms.iter().any(|form| {
            std::iter::once(&form.occurrence)
                .chain(form.duplicates.iter())
                .any(|seen| seen.span == occurrence.span)
        });
        if already_seen {
            continue;
        }
        match group
            .forms
            .iter_mut()
            .find(|form| form.occurrence.original == occurrence.original)
        {
            Some(form) => form.duplicates.push(occurrence),
            None => group.forms.push(WrittenForm {
                occurrence,
                duplicates: Vec::new(),
            }),
        }
    }

    groups
}

/// Find the links in `document` whose text differs from the canonical text.
///
/// Occurrences come from the link index, are deduplicated by raw target and
/// resolved against the document's path. Dangling links are dropped. Every
/// written form of a target gets its own fresh text; forms that are already
/// canonical are left out. The result keeps index encounter order.
pub async fn collect_rewrites(
    document: &Document,
    index: &dyn LinkIndex,
    resolver: &dyn LinkResolver,
    generator: &dyn LinkTextGenerator,
) -> Result<Vec<ResolvedLinkRewrite>, HostError> {
    let Some(occurrences) = index.occurrences(document).await? else {
        return Ok(Vec::new());
    };

    let mut rewrites = Vec::new();
    for group in dedup_by_target(occurrences) {
        let Some(target) = resolver.resolve(&group.target, &document.path).await? else {
            tracing::debug!(
                "{}: dangling link {} left as is",
                document.path,
                group.first().original
            );
            continue;
        };

        let mut changed = Vec::new();
        for form in group.forms {
            let fresh_text = generator
                .generate(&target, &document.path, &form.occurrence)
                .await?;
            if fresh_text != form.occurrence.original {
                changed.push(LinkVariant {
                    occurrence: form.occurrence,
                    duplicates: form.duplicates,
                    fresh_text,
                });
            }
        }

        let mut changed = changed.into_iter();
        let Some(primary) = changed.next() else {
            continue;
        };
        rewrites.push(ResolvedLinkRewrite {
            occurrence: primary.occurrence,
            duplicates: primary.duplicates,
            target,
            fresh_text: primary.fresh_text,
            variants: changed.collect(),
        });
    }

    Ok(rewrites)
}
