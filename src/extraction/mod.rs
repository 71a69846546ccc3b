pub mod exclusion;

use serde::{Deserialize, Serialize};

pub use exclusion::{ExclusionPolicy, ExclusionReason};

use crate::types::{SegmentType, SourceSegment, WordGroup, WordRef};

/// Structured book content, pages in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub nodes: Vec<DocumentNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Paragraph,
    Sentence,
    Word,
    /// Headings, lists, sections and anything else that only groups content.
    #[serde(other)]
    Container,
}

impl NodeKind {
    fn matches(self, granularity: SegmentType) -> bool {
        matches!(
            (self, granularity),
            (NodeKind::Paragraph, SegmentType::Paragraph)
                | (NodeKind::Sentence, SegmentType::Sentence)
                | (NodeKind::Word, SegmentType::Word)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    #[serde(default)]
    pub id: Option<String>,
    pub kind: NodeKind,
    /// Own text. Left empty on nodes whose text is the join of their children.
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "noReadAloud")]
    pub no_read_aloud: bool,
    #[serde(default)]
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    /// Own text, or the space-joined text of the descendants that may be
    /// read aloud.
    pub fn full_text(&self) -> String {
        if !self.text.trim().is_empty() {
            return self.text.trim().to_string();
        }
        let mut parts = Vec::new();
        collect_text(&self.children, &mut parts);
        parts.join(" ")
    }
}

fn collect_text<'a>(nodes: &'a [DocumentNode], parts: &mut Vec<&'a str>) {
    for node in nodes.iter().filter(|node| !node.no_read_aloud) {
        let own = node.text.trim();
        if !own.is_empty() {
            parts.push(own);
        } else {
            collect_text(&node.children, parts);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub included: usize,
    pub excluded_by_flag: usize,
    pub excluded_by_pattern: usize,
    pub missing_id: usize,
    pub empty_text: usize,
}

impl ExtractionStats {
    pub fn excluded(&self) -> usize {
        self.excluded_by_flag + self.excluded_by_pattern + self.missing_id + self.empty_text
    }
}

/// Depth-first reading-order walk collecting included nodes of one kind.
struct Walker<'p> {
    policy: &'p ExclusionPolicy,
    granularity: SegmentType,
    stats: ExtractionStats,
}

impl<'p> Walker<'p> {
    fn new(policy: &'p ExclusionPolicy, granularity: SegmentType) -> Self {
        Self {
            policy,
            granularity,
            stats: ExtractionStats::default(),
        }
    }

    /// `in_sentence` is set below an included sentence. Text there is running
    /// prose, so only ids and flags can exclude a node; words are never
    /// text-checked.
    fn walk<'d>(
        &mut self,
        nodes: &'d [DocumentNode],
        in_sentence: bool,
        out: &mut Vec<(&'d str, &'d DocumentNode)>,
    ) {
        for node in nodes {
            let checks_text = !in_sentence && node.kind != NodeKind::Word;
            let text = checks_text.then_some(node.text.as_str());
            let verdict = self
                .policy
                .verdict(node.id.as_deref(), text, node.no_read_aloud);
            if let Some(reason) = verdict {
                // Excluded nodes take their whole subtree with them.
                match reason {
                    ExclusionReason::Flagged => self.stats.excluded_by_flag += 1,
                    ExclusionReason::Pattern => self.stats.excluded_by_pattern += 1,
                }
                tracing::debug!(
                    id = node.id.as_deref().unwrap_or(""),
                    reason = reason.as_str(),
                    "extraction: excluded node"
                );
                continue;
            }

            if !node.kind.matches(self.granularity) {
                let in_sentence = in_sentence || node.kind == NodeKind::Sentence;
                self.walk(&node.children, in_sentence, out);
                continue;
            }

            match node.id.as_deref() {
                None => self.stats.missing_id += 1,
                Some(_) if node.full_text().is_empty() => self.stats.empty_text += 1,
                Some(id) => {
                    self.stats.included += 1;
                    out.push((id, node));
                }
            }
        }
    }

    fn walk_document<'d>(&mut self, document: &'d Document) -> Vec<(&'d str, &'d DocumentNode)> {
        let mut out = Vec::new();
        for page in &document.pages {
            self.walk(&page.nodes, false, &mut out);
        }
        out
    }
}

/// Ordered syncable segments of `document` at `granularity`.
///
/// Returns an empty list (never an error) when nothing qualifies; callers
/// must treat that as the end of the pipeline.
pub fn extract(
    document: &Document,
    granularity: SegmentType,
    policy: &ExclusionPolicy,
) -> Vec<SourceSegment> {
    extract_with_stats(document, granularity, policy).0
}

pub fn extract_with_stats(
    document: &Document,
    granularity: SegmentType,
    policy: &ExclusionPolicy,
) -> (Vec<SourceSegment>, ExtractionStats) {
    let mut walker = Walker::new(policy, granularity);
    let segments = walker
        .walk_document(document)
        .into_iter()
        .enumerate()
        .map(|(position, (id, node))| SourceSegment {
            id: id.to_string(),
            text: node.full_text(),
            segment_type: granularity,
            position,
        })
        .collect::<Vec<_>>();

    let stats = walker.stats;
    tracing::info!(
        granularity = granularity.as_str(),
        included = stats.included,
        excluded = stats.excluded(),
        excluded_by_flag = stats.excluded_by_flag,
        excluded_by_pattern = stats.excluded_by_pattern,
        missing_id = stats.missing_id,
        empty_text = stats.empty_text,
        "extraction: segments collected"
    );
    if segments.is_empty() {
        tracing::warn!(
            granularity = granularity.as_str(),
            "extraction: no segments qualify for synchronization"
        );
    }
    (segments, stats)
}

/// Included sentences paired with their included child words.
///
/// Sentences without any qualifying word are left out.
pub fn extract_word_groups(document: &Document, policy: &ExclusionPolicy) -> Vec<WordGroup> {
    let mut sentences = Walker::new(policy, SegmentType::Sentence);
    sentences
        .walk_document(document)
        .into_iter()
        .filter_map(|(parent_id, sentence)| {
            let mut words = Vec::new();
            Walker::new(policy, SegmentType::Word).walk(&sentence.children, true, &mut words);
            if words.is_empty() {
                return None;
            }
            Some(WordGroup {
                parent_id: parent_id.to_string(),
                words: words
                    .into_iter()
                    .map(|(id, word)| WordRef {
                        id: id.to_string(),
                        text: word.full_text(),
                    })
                    .collect(),
            })
        })
        .collect()
}
