use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result},
    str::FromStr,
};
use thiserror::Error;

use crate::repository::{Uid, uid::UidRangeInclusiveIterator};

#[derive(Debug, PartialEq, Clone)]
pub struct SequenceRange {
    start: Uid,
    end: Option<Uid>,
}

impl SequenceRange {
    fn single(uid: Uid) -> Self {
        Self {
            start: uid,
            end: None,
        }
    }

    fn iter(&self) -> UidRangeInclusiveIterator {
        self.start.range_inclusive(self.end())
    }

    fn end(&self) -> Uid {
        self.end.unwrap_or(self.start)
    }
}

impl Display for SequenceRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if let Some(to) = self.end {
            write!(f, "{}:{}", self.start, to)
        } else {
            write!(f, "{}", self.start)
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SequenceSetError {
    #[error("No numbers in sequence set")]
    Empty,
    #[error("invalid uid {0:?} in sequence set")]
    InvalidUid(String),
    #[error("descending range {0} in sequence set")]
    Descending(String),
}

#[derive(Default, Debug, PartialEq, Clone)]
pub struct SequenceSetBuilder {
    nums: HashSet<Uid>,
}

impl SequenceSetBuilder {
    pub fn add(&mut self, uid: Uid) {
        self.nums.insert(uid);
    }

    pub fn remove(&mut self, uid: Uid) -> bool {
        self.nums.remove(&uid)
    }

    pub fn build(mut self) -> std::result::Result<SequenceSet, SequenceSetError> {
        let mut sorted_nums: Vec<Uid> = self.nums.drain().collect();
        sorted_nums.sort_unstable();
        let mut sorted_nums = sorted_nums.into_iter();

        let Some(first_num) = sorted_nums.next() else {
            return Err(SequenceSetError::Empty);
        };
        let mut ranges = Vec::new();
        let mut current_range = SequenceRange::single(first_num);

        for num in sorted_nums {
            if u32::from(current_range.end()).checked_add(1) == Some(u32::from(num)) {
                current_range.end = Some(num);
            } else {
                ranges.push(current_range);
                current_range = SequenceRange::single(num);
            }
        }
        ranges.push(current_range);

        Ok(SequenceSet { ranges })
    }
}

/// Compressed set of uids as used on the wire, e.g. `3:5,12,14:15`.
#[derive(Debug, PartialEq, Clone)]
pub struct SequenceSet {
    ranges: Vec<SequenceRange>,
}

impl SequenceSet {
    /// Ascending uids, each once.
    pub fn iter(&self) -> impl Iterator<Item = Uid> {
        self.ranges.iter().flat_map(SequenceRange::iter)
    }
}

impl Display for SequenceSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mut ranges = self.ranges.iter();
        if let Some(first) = ranges.next() {
            write!(f, "{first}")?;
        }
        for range in ranges {
            write!(f, ",{range}")?;
        }
        Ok(())
    }
}

impl TryFrom<&[Uid]> for SequenceSet {
    type Error = SequenceSetError;

    fn try_from(value: &[Uid]) -> std::result::Result<Self, Self::Error> {
        value
            .iter()
            .fold(SequenceSetBuilder::default(), |mut builder, uid| {
                builder.add(*uid);
                builder
            })
            .build()
    }
}

fn parse_uid(value: &str) -> std::result::Result<Uid, SequenceSetError> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(|num| Uid::try_from(num).ok())
        .ok_or_else(|| SequenceSetError::InvalidUid(value.to_string()))
}

impl FromStr for SequenceSet {
    type Err = SequenceSetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut builder = SequenceSetBuilder::default();
        for member in s.split(',').filter(|member| !member.trim().is_empty()) {
            if let Some((start, end)) = member.split_once(':') {
                let start = parse_uid(start)?;
                let end = parse_uid(end)?;
                if end < start {
                    return Err(SequenceSetError::Descending(member.to_string()));
                }
                for uid in start.range_inclusive(end) {
                    builder.add(uid);
                }
            } else {
                builder.add(parse_uid(member)?);
            }
        }
        builder.build()
    }
}
