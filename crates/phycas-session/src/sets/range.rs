//! NEXUS-style member descriptions such as `1-10\2 15 17`.

use std::fmt;
use std::iter;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One item of a member description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberRange {
    /// A single index.
    Single {
        /// The index.
        index: u32,
    },
    /// An inclusive arithmetic progression from `start` to at most `end`.
    Span {
        /// First index.
        start: u32,
        /// Inclusive upper bound.
        end: u32,
        /// Distance between consecutive members, at least one.
        stride: u32,
    },
}

impl MemberRange {
    /// Expands the item into the indices it names.
    pub fn indices(self) -> impl Iterator<Item = u32> {
        let (start, end, stride) = match self {
            Self::Single { index } => (index, index, 1),
            Self::Span { start, end, stride } => (start, end, stride.max(1)),
        };
        iter::successors(Some(start), move |current| {
            current.checked_add(stride).filter(|next| *next <= end)
        })
    }
}

impl fmt::Display for MemberRange {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single { index } => write!(formatter, "{index}"),
            Self::Span {
                start,
                end,
                stride: 1,
            } => write!(formatter, "{start}-{end}"),
            Self::Span { start, end, stride } => write!(formatter, "{start}-{end}\\{stride}"),
        }
    }
}

/// Errors raised while parsing a member description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberSpecError {
    /// A token was neither an index nor a range operator.
    #[error("'{token}' is not a valid index")]
    InvalidIndex {
        /// Offending token.
        token: String,
    },
    /// Indices start at one.
    #[error("index 0 is outside the one-based domain")]
    ZeroIndex,
    /// A range ended before it started.
    #[error("range {start}-{end} is descending")]
    DescendingRange {
        /// First index of the range.
        start: u32,
        /// Last index of the range.
        end: u32,
    },
    /// A stride of zero never advances.
    #[error("range stride must be positive")]
    ZeroStride,
    /// A `-` or `\` was not followed by an index.
    #[error("'{operator}' must be followed by an index")]
    DanglingOperator {
        /// The operator missing its operand.
        operator: char,
    },
    /// A `-` or `\` appeared where an index was expected.
    #[error("unexpected '{operator}'")]
    UnexpectedOperator {
        /// The misplaced operator.
        operator: char,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Index(u32),
    Through,
    Stride,
}

fn tokenize(spec: &str) -> Result<Vec<Token>, MemberSpecError> {
    let mut tokens = Vec::new();
    let mut digits = String::new();
    for character in spec.chars() {
        if character.is_ascii_digit() {
            digits.push(character);
            continue;
        }
        if !digits.is_empty() {
            tokens.push(parse_index(&digits)?);
            digits.clear();
        }
        match character {
            '-' => tokens.push(Token::Through),
            '\\' => tokens.push(Token::Stride),
            other if other.is_whitespace() => {}
            other => {
                let token = spec
                    .split(|candidate: char| candidate.is_whitespace() || candidate == '-')
                    .find(|word| word.contains(other))
                    .unwrap_or_default();
                return Err(MemberSpecError::InvalidIndex {
                    token: token.to_owned(),
                });
            }
        }
    }
    if !digits.is_empty() {
        tokens.push(parse_index(&digits)?);
    }
    Ok(tokens)
}

fn parse_index(digits: &str) -> Result<Token, MemberSpecError> {
    digits
        .parse::<u32>()
        .map(Token::Index)
        .map_err(|_| MemberSpecError::InvalidIndex {
            token: digits.to_owned(),
        })
}

fn operand(
    tokens: &mut impl Iterator<Item = Token>,
    operator: char,
) -> Result<u32, MemberSpecError> {
    match tokens.next() {
        Some(Token::Index(value)) => Ok(value),
        _ => Err(MemberSpecError::DanglingOperator { operator }),
    }
}

/// Parses a member description into its range items.
///
/// Both a plain space separated list (`1 2 5`) and NEXUS range notation
/// (`1-10\2 15`) are accepted, and may be mixed.
///
/// # Errors
///
/// Returns [`MemberSpecError`] for unknown tokens, zero indices, descending
/// ranges, zero strides and operators without operands.
pub fn parse_member_ranges(spec: &str) -> Result<Vec<MemberRange>, MemberSpecError> {
    let mut tokens = tokenize(spec)?.into_iter().peekable();
    let mut ranges = Vec::new();
    while let Some(token) = tokens.next() {
        let start = match token {
            Token::Index(0) => return Err(MemberSpecError::ZeroIndex),
            Token::Index(index) => index,
            Token::Through => return Err(MemberSpecError::UnexpectedOperator { operator: '-' }),
            Token::Stride => return Err(MemberSpecError::UnexpectedOperator { operator: '\\' }),
        };
        if tokens.next_if_eq(&Token::Through).is_none() {
            ranges.push(MemberRange::Single { index: start });
            continue;
        }
        let end = operand(&mut tokens, '-')?;
        if end < start {
            return Err(MemberSpecError::DescendingRange { start, end });
        }
        let stride = if tokens.next_if_eq(&Token::Stride).is_some() {
            operand(&mut tokens, '\\')?
        } else {
            1
        };
        if stride == 0 {
            return Err(MemberSpecError::ZeroStride);
        }
        ranges.push(MemberRange::Span { start, end, stride });
    }
    Ok(ranges)
}

/// Parses a member description into the ordered indices it names.
///
/// # Errors
///
/// See [`parse_member_ranges`].
pub fn parse_member_spec(spec: &str) -> Result<Vec<u32>, MemberSpecError> {
    Ok(expand(&parse_member_ranges(spec)?))
}

/// Expands range items into indices, preserving order.
#[must_use]
pub fn expand(ranges: &[MemberRange]) -> Vec<u32> {
    ranges.iter().flat_map(|range| range.indices()).collect()
}

/// Groups indices into the shortest run-based description.
///
/// Consecutive runs of two or more become `a-b`; evenly spaced runs of three
/// or more with a wider stride become `a-b\s`; everything else stays single.
#[must_use]
pub fn compact_ranges(indices: &[u32]) -> Vec<MemberRange> {
    let mut ranges = Vec::new();
    let mut rest = indices;
    while let Some((&first, tail)) = rest.split_first() {
        let (range, consumed) = match arithmetic_run(first, tail) {
            Some((1, taken, end)) => (
                MemberRange::Span {
                    start: first,
                    end,
                    stride: 1,
                },
                taken,
            ),
            Some((stride, taken, end)) if taken >= 2 => (
                MemberRange::Span {
                    start: first,
                    end,
                    stride,
                },
                taken,
            ),
            _ => (MemberRange::Single { index: first }, 0),
        };
        ranges.push(range);
        rest = tail.split_at_checked(consumed).map_or(&[], |(_, after)| after);
    }
    ranges
}

/// Returns the stride, the number of following indices in the run and the
/// last index of the run.
fn arithmetic_run(first: u32, tail: &[u32]) -> Option<(u32, usize, u32)> {
    let second = *tail.first()?;
    let stride = second.checked_sub(first).filter(|stride| *stride > 0)?;
    let mut previous = first;
    let taken = tail
        .iter()
        .take_while(|next| {
            let continues = next.checked_sub(previous) == Some(stride);
            if continues {
                previous = **next;
            }
            continues
        })
        .count();
    Some((stride, taken, previous))
}

/// Renders indices in canonical compact notation.
#[must_use]
pub fn format_member_spec(indices: &[u32]) -> String {
    format_ranges(&compact_ranges(indices))
}

/// Renders range items separated by single spaces.
#[must_use]
pub fn format_ranges(ranges: &[MemberRange]) -> String {
    ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
