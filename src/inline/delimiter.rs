/// Delimiter runs, delimiter processors and the emphasis resolution pass
use super::InlineRun;
use crate::chars::{is_punctuation, is_whitespace};
use crate::error::ConfigError;
use crate::node::{NodeId, NodeValue, Tree};
use crate::scanner::END;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A run of delimiter characters such as `**`, as seen by a [`DelimiterProcessor`].
///
/// Every character is its own `Text` node so that a run can be consumed
/// partially. Openers are used from the end, closers from the start.
#[derive(Debug, Clone)]
pub struct DelimiterRun {
    characters: VecDeque<NodeId>,
    delimiter_char: char,
    original_length: usize,
    can_open: bool,
    can_close: bool,
    previous: Option<usize>,
    next: Option<usize>,
}

impl DelimiterRun {
    pub fn delimiter_char(&self) -> char {
        self.delimiter_char
    }

    pub fn can_open(&self) -> bool {
        self.can_open
    }

    pub fn can_close(&self) -> bool {
        self.can_close
    }

    /// Characters not yet consumed.
    pub fn length(&self) -> usize {
        self.characters.len()
    }

    /// Length of the run as it appeared in the source.
    pub fn original_length(&self) -> usize {
        self.original_length
    }

    /// The innermost opening character, used as the anchor for wrapping.
    pub fn opener(&self) -> NodeId {
        self.characters[self.characters.len() - 1]
    }

    /// The innermost closing character.
    pub fn closer(&self) -> NodeId {
        self.characters[0]
    }

    /// The last `length` characters, in document order.
    pub fn openers(&self, length: usize) -> Vec<NodeId> {
        let start = self.characters.len().saturating_sub(length);
        self.characters.range(start..).copied().collect()
    }

    /// The first `length` characters.
    pub fn closers(&self, length: usize) -> Vec<NodeId> {
        self.characters.iter().take(length).copied().collect()
    }
}

/// Turns a matching opener/closer pair of delimiter runs into a node.
pub trait DelimiterProcessor: Send + Sync {
    fn opening_character(&self) -> char;

    fn closing_character(&self) -> char;

    /// Shortest run that this processor handles.
    fn min_length(&self) -> usize;

    /// Wrap the nodes between `opener` and `closer` and return how many
    /// delimiter characters were used from each side. Returning 0 rejects
    /// the pair and the search for an opener continues.
    fn process(&self, tree: &mut Tree, opener: &DelimiterRun, closer: &DelimiterRun) -> usize;
}

/// `*` and `_` emphasis. Two characters on both sides make strong emphasis.
pub struct EmphasisDelimiterProcessor {
    delimiter_char: char,
}

impl EmphasisDelimiterProcessor {
    pub fn new(delimiter_char: char) -> Self {
        EmphasisDelimiterProcessor { delimiter_char }
    }
}

impl DelimiterProcessor for EmphasisDelimiterProcessor {
    fn opening_character(&self) -> char {
        self.delimiter_char
    }

    fn closing_character(&self) -> char {
        self.delimiter_char
    }

    fn min_length(&self) -> usize {
        1
    }

    fn process(&self, tree: &mut Tree, opener: &DelimiterRun, closer: &DelimiterRun) -> usize {
        // Runs that can both open and close only match if the sum of their
        // lengths is not a multiple of 3, unless both lengths are.
        if (opener.can_close() || closer.can_open())
            && closer.original_length() % 3 != 0
            && (opener.original_length() + closer.original_length()) % 3 == 0
        {
            return 0;
        }

        let delimiter = self.delimiter_char;
        let (used, value) = if opener.length() >= 2 && closer.length() >= 2 {
            (2, NodeValue::StrongEmphasis { delimiter })
        } else {
            (1, NodeValue::Emphasis { delimiter })
        };
        let emphasis = tree.create(value);
        wrap(tree, emphasis, opener, closer, used);
        used
    }
}

/// Move everything between the runs into `wrapper`, place it after the
/// opener and give it the spans of the used delimiters and its content.
fn wrap(tree: &mut Tree, wrapper: NodeId, opener: &DelimiterRun, closer: &DelimiterRun, used: usize) {
    let opener_node = opener.opener();
    tree.wrap_between(wrapper, opener_node, closer.closer());

    let content: Vec<NodeId> = tree.children(wrapper).collect();
    let spans: Vec<_> = opener
        .openers(used)
        .into_iter()
        .chain(content)
        .chain(closer.closers(used))
        .flat_map(|node| tree.source_spans(node).to_vec())
        .collect();
    tree.merge_source_spans(wrapper, spans);
    tree.insert_after(opener_node, wrapper);
}

/// Several processors for one character, picked by run length: the one
/// with the largest minimum length that the opening run still satisfies.
#[derive(Clone)]
pub(crate) struct StaggeredDelimiterProcessor {
    delimiter_char: char,
    min_length: usize,
    /// Ordered by descending minimum length.
    processors: Vec<Arc<dyn DelimiterProcessor>>,
}

impl StaggeredDelimiterProcessor {
    fn new(delimiter_char: char) -> Self {
        StaggeredDelimiterProcessor {
            delimiter_char,
            min_length: 0,
            processors: Vec::new(),
        }
    }

    fn add(&mut self, processor: Arc<dyn DelimiterProcessor>) -> Result<(), ConfigError> {
        let length = processor.min_length();
        let position = self.processors.iter().position(|p| p.min_length() <= length);
        match position {
            Some(i) if self.processors[i].min_length() == length => {
                Err(ConfigError::DuplicateDelimiterProcessor {
                    delimiter: self.delimiter_char,
                    min_length: length,
                })
            }
            Some(i) => {
                self.processors.insert(i, processor);
                Ok(())
            }
            None => {
                self.processors.push(processor);
                self.min_length = length;
                Ok(())
            }
        }
    }

    fn find_processor(&self, length: usize) -> Option<&dyn DelimiterProcessor> {
        self.processors
            .iter()
            .find(|p| p.min_length() <= length)
            .or_else(|| self.processors.first())
            .map(|processor| processor.as_ref())
    }
}

impl DelimiterProcessor for StaggeredDelimiterProcessor {
    fn opening_character(&self) -> char {
        self.delimiter_char
    }

    fn closing_character(&self) -> char {
        self.delimiter_char
    }

    fn min_length(&self) -> usize {
        self.min_length
    }

    fn process(&self, tree: &mut Tree, opener: &DelimiterRun, closer: &DelimiterRun) -> usize {
        self.find_processor(opener.length())
            .map_or(0, |processor| processor.process(tree, opener, closer))
    }
}

#[derive(Clone)]
enum Registered {
    Single(Arc<dyn DelimiterProcessor>),
    Staggered(StaggeredDelimiterProcessor),
}

impl Registered {
    fn processor(&self) -> &dyn DelimiterProcessor {
        match self {
            Registered::Single(processor) => processor.as_ref(),
            Registered::Staggered(staggered) => staggered,
        }
    }
}

/// Delimiter processors by character, validated as they are added.
#[derive(Clone, Default)]
pub(crate) struct DelimiterProcessors {
    by_char: HashMap<char, Registered>,
}

impl DelimiterProcessors {
    /// The built-in `*` and `_` processors.
    pub(crate) fn with_emphasis() -> Self {
        let mut processors = DelimiterProcessors::default();
        for c in ['*', '_'] {
            processors
                .by_char
                .insert(c, Registered::Single(Arc::new(EmphasisDelimiterProcessor::new(c))));
        }
        processors
    }

    /// Register `processor`. A second symmetric processor for a character
    /// combines with the first into a staggered one; anything else that
    /// reuses a character is a conflict.
    pub(crate) fn add(&mut self, processor: Arc<dyn DelimiterProcessor>) -> Result<(), ConfigError> {
        let opening = processor.opening_character();
        let closing = processor.closing_character();

        if opening != closing {
            for c in [opening, closing] {
                if self.by_char.contains_key(&c) {
                    return Err(ConfigError::DelimiterCharacterConflict { delimiter: c });
                }
            }
            self.by_char.insert(opening, Registered::Single(Arc::clone(&processor)));
            self.by_char.insert(closing, Registered::Single(processor));
            return Ok(());
        }

        let Some(existing) = self.by_char.get(&opening) else {
            self.by_char.insert(opening, Registered::Single(processor));
            return Ok(());
        };
        let mut staggered = match existing {
            Registered::Staggered(staggered) => staggered.clone(),
            Registered::Single(old) if old.opening_character() == old.closing_character() => {
                let mut staggered = StaggeredDelimiterProcessor::new(opening);
                staggered.add(Arc::clone(old))?;
                staggered
            }
            Registered::Single(_) => {
                return Err(ConfigError::DelimiterCharacterConflict { delimiter: opening });
            }
        };
        staggered.add(processor)?;
        self.by_char.insert(opening, Registered::Staggered(staggered));
        Ok(())
    }

    pub(crate) fn get(&self, c: char) -> Option<&dyn DelimiterProcessor> {
        self.by_char.get(&c).map(Registered::processor)
    }

    pub(crate) fn characters(&self) -> impl Iterator<Item = char> + '_ {
        self.by_char.keys().copied()
    }
}

impl InlineRun<'_> {
    /// Try to read a delimiter run at the scanner. On success every
    /// character becomes a `Text` node under the block and the run is
    /// pushed onto the delimiter stack.
    pub(super) fn parse_delimiters(&mut self, processor: &dyn DelimiterProcessor, delimiter_char: char) -> bool {
        let before = self.scanner.peek_previous();
        let start = self.scanner.position();

        if self.scanner.match_multiple(delimiter_char) < processor.min_length() {
            self.scanner.set_position(start);
            return false;
        }

        self.scanner.set_position(start);
        let mut characters = VecDeque::new();
        let mut position_before = start;
        while self.scanner.advance_if(delimiter_char) {
            let source = self.scanner.source(position_before, self.scanner.position());
            let node = self.text(delimiter_char.to_string(), &source);
            self.tree.append_child(self.block, node);
            characters.push_back(node);
            position_before = self.scanner.position();
        }
        let after = self.scanner.peek();

        // Line starts and ends count as whitespace.
        let before_is_whitespace = before == END || is_whitespace(before);
        let before_is_punctuation = before != END && is_punctuation(before);
        let after_is_whitespace = after == END || is_whitespace(after);
        let after_is_punctuation = after != END && is_punctuation(after);

        let left_flanking =
            !after_is_whitespace && (!after_is_punctuation || before_is_whitespace || before_is_punctuation);
        let right_flanking =
            !before_is_whitespace && (!before_is_punctuation || after_is_whitespace || after_is_punctuation);

        let (can_open, can_close) = if delimiter_char == '_' {
            (
                left_flanking && (!right_flanking || before_is_punctuation),
                right_flanking && (!left_flanking || after_is_punctuation),
            )
        } else {
            (
                left_flanking && delimiter_char == processor.opening_character(),
                right_flanking && delimiter_char == processor.closing_character(),
            )
        };

        let index = self.delimiters.len();
        self.delimiters.push(DelimiterRun {
            original_length: characters.len(),
            characters,
            delimiter_char,
            can_open,
            can_close,
            previous: self.last_delimiter,
            next: None,
        });
        if let Some(previous) = self.last_delimiter {
            self.delimiters[previous].next = Some(index);
        }
        self.last_delimiter = Some(index);
        true
    }

    /// Match closers with openers above `stack_bottom`, innermost first,
    /// then drop every delimiter above it from the stack.
    pub(super) fn process_delimiters(&mut self, stack_bottom: Option<usize>) {
        let context = self.context;
        // Per character, the delimiter below which no opener can be found.
        let mut openers_bottom: HashMap<char, Option<usize>> = HashMap::new();

        // First delimiter above the bottom
        let mut closer = self.last_delimiter;
        while let Some(c) = closer {
            if self.delimiters[c].previous == stack_bottom {
                break;
            }
            closer = self.delimiters[c].previous;
        }

        while let Some(closer_index) = closer {
            let delimiter_char = self.delimiters[closer_index].delimiter_char;
            let processor = match context.delimiters.get(delimiter_char) {
                Some(processor) if self.delimiters[closer_index].can_close => processor,
                _ => {
                    closer = self.delimiters[closer_index].next;
                    continue;
                }
            };
            let opening_char = processor.opening_character();

            let mut used = 0;
            let mut opener_found = None;
            let mut potential_opener_found = false;
            let mut opener = self.delimiters[closer_index].previous;
            let bottom = openers_bottom.get(&delimiter_char).copied().flatten();
            while let Some(opener_index) = opener {
                if Some(opener_index) == stack_bottom || Some(opener_index) == bottom {
                    break;
                }
                let candidate = &self.delimiters[opener_index];
                if candidate.can_open && candidate.delimiter_char == opening_char {
                    potential_opener_found = true;
                    used = processor.process(self.tree, candidate, &self.delimiters[closer_index]);
                    if used > 0 {
                        opener_found = Some(opener_index);
                        break;
                    }
                }
                opener = self.delimiters[opener_index].previous;
            }

            let Some(opener_index) = opener_found else {
                if !potential_opener_found {
                    // Only raise the bottom when nothing could have matched. A
                    // rejected opener may still match once run lengths change.
                    openers_bottom.insert(delimiter_char, self.delimiters[closer_index].previous);
                    if !self.delimiters[closer_index].can_open {
                        self.remove_delimiter(closer_index);
                    }
                }
                closer = self.delimiters[closer_index].next;
                continue;
            };

            for _ in 0..used {
                if let Some(node) = self.delimiters[opener_index].characters.pop_back() {
                    self.tree.unlink(node);
                }
                if let Some(node) = self.delimiters[closer_index].characters.pop_front() {
                    self.tree.unlink(node);
                }
            }

            self.remove_delimiters_between(opener_index, closer_index);

            if self.delimiters[opener_index].characters.is_empty() {
                self.remove_delimiter(opener_index);
            }
            if self.delimiters[closer_index].characters.is_empty() {
                let next = self.delimiters[closer_index].next;
                self.remove_delimiter(closer_index);
                closer = next;
            }
        }

        // Whatever is left above the bottom stays as plain text.
        while let Some(last) = self.last_delimiter {
            if Some(last) == stack_bottom {
                break;
            }
            self.remove_delimiter(last);
        }
    }

    fn remove_delimiters_between(&mut self, opener: usize, closer: usize) {
        let mut delimiter = self.delimiters[closer].previous;
        while let Some(index) = delimiter {
            if index == opener {
                break;
            }
            delimiter = self.delimiters[index].previous;
            self.remove_delimiter(index);
        }
    }

    /// Unhook a delimiter from the stack. Its text nodes stay in the tree.
    fn remove_delimiter(&mut self, index: usize) {
        let previous = self.delimiters[index].previous;
        let next = self.delimiters[index].next;
        if let Some(previous) = previous {
            self.delimiters[previous].next = next;
        }
        match next {
            Some(next) => self.delimiters[next].previous = previous,
            None => self.last_delimiter = previous,
        }
    }
}
