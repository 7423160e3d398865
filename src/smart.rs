//! Smart-playlist criteria.
//!
//! Smart playlists travel as two opaque blobs on the playlist record: an
//! info block of option flags and an `SLst` container of criterion rules.
//! This module decodes the container header and the rule vocabulary;
//! operand layouts that the data does not cover stay raw rather than
//! failing the playlist.

use crate::error::{Error, Result};
use crate::text;
use serde::Serialize;

/// How multiple rules combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn from_code(code: u8) -> Self {
        if code == 0x1 {
            Conjunction::Or
        } else {
            Conjunction::And
        }
    }
}

/// Track attribute a rule matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuleField {
    Name,
    Album,
    Artist,
    BitRate,
    SampleRate,
    Year,
    Genre,
    Kind,
    DateModified,
    TrackNumber,
    Size,
    TotalTime,
    Comments,
    DateAdded,
    Composer,
    PlayCount,
    PlayDate,
    DiscNumber,
    Rating,
    Disabled,
    Compilation,
    Bpm,
    HasArtwork,
    Grouping,
    PlaylistPersistentId,
    Purchased,
    Description,
    Category,
    Podcast,
    MediaKind,
    Series,
    Season,
    SkipCount,
    SkipDate,
    AlbumArtist,
    SortName,
    SortAlbum,
    SortAlbumArtist,
    SortComposer,
    SortSeries,
    VideoRating,
    AlbumRating,
    Location,
    ICloudStatus,
    Love,
    Unknown(u32),
}

impl RuleField {
    pub fn from_code(code: u32) -> Self {
        use RuleField::*;
        match code {
            0x02 => Name,
            0x03 => Album,
            0x04 => Artist,
            0x05 => BitRate,
            0x06 => SampleRate,
            0x07 => Year,
            0x08 => Genre,
            0x09 => Kind,
            0x0A => DateModified,
            0x0B => TrackNumber,
            0x0C => Size,
            0x0D => TotalTime,
            0x0E => Comments,
            0x10 => DateAdded,
            0x12 => Composer,
            0x16 => PlayCount,
            0x17 => PlayDate,
            0x18 => DiscNumber,
            0x19 => Rating,
            0x1D => Disabled,
            0x1F => Compilation,
            0x23 => Bpm,
            0x25 => HasArtwork,
            0x27 => Grouping,
            0x28 => PlaylistPersistentId,
            0x29 => Purchased,
            0x36 => Description,
            0x37 => Category,
            0x39 => Podcast,
            0x3C => MediaKind,
            0x3E => Series,
            0x3F => Season,
            0x44 => SkipCount,
            0x45 => SkipDate,
            0x47 => AlbumArtist,
            0x4E => SortName,
            0x4F => SortAlbum,
            0x51 => SortAlbumArtist,
            0x52 => SortComposer,
            0x53 => SortSeries,
            0x59 => VideoRating,
            0x5A => AlbumRating,
            0x85 => Location,
            0x86 => ICloudStatus,
            0x9A => Love,
            other => Unknown(other),
        }
    }
}

/// Comparison performed by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicRule {
    Other,
    Is,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    Between,
    Within,
    Unknown(u16),
}

impl LogicRule {
    pub fn from_code(code: u16) -> Self {
        match code {
            0x0 => LogicRule::Other,
            0x1 => LogicRule::Is,
            0x2 => LogicRule::Contains,
            0x4 => LogicRule::StartsWith,
            0x8 => LogicRule::EndsWith,
            0x10 => LogicRule::GreaterThan,
            0x40 => LogicRule::LessThan,
            0x100 => LogicRule::Between,
            0x200 => LogicRule::Within,
            other => LogicRule::Unknown(other),
        }
    }
}

/// Operand type and polarity of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicSign {
    IntPositive,
    StrPositive,
    IntNegative,
    StrNegative,
    Unknown(u8),
}

impl LogicSign {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x0 => LogicSign::IntPositive,
            0x1 => LogicSign::StrPositive,
            0x2 => LogicSign::IntNegative,
            0x3 => LogicSign::StrNegative,
            other => LogicSign::Unknown(other),
        }
    }

    fn is_string(self) -> bool {
        matches!(self, LogicSign::StrPositive | LogicSign::StrNegative)
    }
}

/// Unit of the playlist size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LimitMethod {
    Minutes,
    Megabytes,
    Items,
    Hours,
    Gigabytes,
    Unknown(u8),
}

impl LimitMethod {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x1 => LimitMethod::Minutes,
            0x2 => LimitMethod::Megabytes,
            0x3 => LimitMethod::Items,
            0x4 => LimitMethod::Hours,
            0x5 => LimitMethod::Gigabytes,
            other => LimitMethod::Unknown(other),
        }
    }
}

/// Attribute used to pick tracks when the limit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionMethod {
    LowestRating,
    Random,
    Name,
    Album,
    Artist,
    Genre,
    DateAdded,
    PlayCount,
    PlayDate,
    Rating,
    Unknown(u32),
}

impl SelectionMethod {
    pub fn from_code(code: u32) -> Self {
        match code {
            0x1 => SelectionMethod::LowestRating,
            0x2 => SelectionMethod::Random,
            0x5 => SelectionMethod::Name,
            0x6 => SelectionMethod::Album,
            0x7 => SelectionMethod::Artist,
            0x9 => SelectionMethod::Genre,
            0x15 => SelectionMethod::DateAdded,
            0x19 => SelectionMethod::PlayCount,
            0x1A => SelectionMethod::PlayDate,
            0x1C => SelectionMethod::Rating,
            other => SelectionMethod::Unknown(other),
        }
    }
}

/// Option flags from the info blob.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SmartInfo {
    pub live_updating: bool,
    pub check_rules: bool,
    pub check_limit: bool,
    pub limit_method: Option<LimitMethod>,
    pub selection_method: Option<SelectionMethod>,
    pub limit_size: u32,
    pub reverse_selection: bool,
}

/// The rule container.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SmartCriteria {
    pub conjunction: Conjunction,
    pub rules: Vec<CriterionRule>,
}

/// One criterion rule.
#[derive(Debug, Clone, Serialize)]
pub struct CriterionRule {
    pub field: RuleField,
    pub sign: LogicSign,
    pub operator: LogicRule,
    pub operand: RuleOperand,
}

/// Decoded rule operand.
#[derive(Debug, Clone, Serialize)]
pub enum RuleOperand {
    /// String comparison text.
    Text(String),
    /// Integer/range comparison values.
    Ints(Vec<u64>),
    /// Layout not understood; kept verbatim.
    Raw(Vec<u8>),
}

/// A parsed smart playlist.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SmartPlaylist {
    pub info: SmartInfo,
    pub criteria: SmartCriteria,
}

const CRITERIA_MAGIC: &[u8; 4] = b"SLst";

/// Offset of the first rule inside the criteria container.
const RULES_START: usize = 160;

/// Offset of the operand length word within a rule.
const RULE_LEN_AT: usize = 52;

/// Offset of the operand bytes within a rule.
const RULE_BODY_AT: usize = 56;

fn be_u32(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_be_bytes(b.try_into().unwrap()))
}

fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2)
        .map(|b| u16::from_be_bytes(b.try_into().unwrap()))
}

fn parse_info(info: &[u8]) -> SmartInfo {
    SmartInfo {
        live_updating: info.first().is_some_and(|&b| b != 0),
        check_rules: info.get(1).is_some_and(|&b| b != 0),
        check_limit: info.get(2).is_some_and(|&b| b != 0),
        limit_method: info
            .get(3)
            .filter(|&&b| b != 0)
            .map(|&b| LimitMethod::from_code(b)),
        selection_method: be_u32(info, 4)
            .filter(|&v| v != 0)
            .map(SelectionMethod::from_code),
        limit_size: be_u32(info, 8).unwrap_or(0),
        reverse_selection: info.get(12).is_some_and(|&b| b != 0),
    }
}

fn parse_rule(data: &[u8], at: usize) -> Option<(CriterionRule, usize)> {
    let field = be_u32(data, at)?;
    let sign = LogicSign::from_code(*data.get(at + 4)?);
    let operator = LogicRule::from_code(be_u16(data, at + 6)?);
    let len = be_u32(data, at + RULE_LEN_AT)? as usize;
    let body_at = at + RULE_BODY_AT;
    let body = data.get(body_at..body_at + len)?;

    let operand = if sign.is_string() {
        RuleOperand::Text(text::utf16_be(body))
    } else if len > 0 && len % 8 == 0 {
        RuleOperand::Ints(
            body.chunks_exact(8)
                .map(|c| u64::from_be_bytes(c.try_into().unwrap()))
                .collect(),
        )
    } else {
        RuleOperand::Raw(body.to_vec())
    };

    Some((
        CriterionRule {
            field: RuleField::from_code(field),
            sign,
            operator,
            operand,
        },
        body_at + len,
    ))
}

/// Decode the smart-playlist blobs attached to a playlist record.
///
/// The header (magic, rule count, conjunction) must be present; rules the
/// data does not fully cover are dropped with a log line rather than
/// failing the caller.
pub fn parse(info: &[u8], criteria: &[u8]) -> Result<SmartPlaylist> {
    if criteria.len() < 13 || &criteria[..4] != CRITERIA_MAGIC {
        return Err(Error::format("smart criteria container missing SLst header"));
    }
    let declared = be_u32(criteria, 8).unwrap_or(0) as usize;
    let conjunction = Conjunction::from_code(criteria[12]);

    let mut rules = Vec::with_capacity(declared.min(64));
    let mut at = RULES_START;
    while rules.len() < declared {
        match parse_rule(criteria, at) {
            Some((rule, next)) => {
                rules.push(rule);
                at = next;
            }
            None => {
                log::debug!(
                    "smart criteria truncated after {} of {} rules",
                    rules.len(),
                    declared
                );
                break;
            }
        }
    }

    Ok(SmartPlaylist {
        info: parse_info(info),
        criteria: SmartCriteria { conjunction, rules },
    })
}
