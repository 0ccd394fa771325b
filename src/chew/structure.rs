use log::warn;

use crate::{
    chew::header::{decode_rfc2231, decode_words, strip_arrows},
    imap::{BodyPart, LeafPart, MultipartPart},
    store::{AttachmentInfo, BodyKind, BodyRep, PartFetchInfo},
};

/// Parts of a message sorted by how they will be shown.
#[derive(Debug, Default, PartialEq)]
pub struct ChewedStructure {
    pub body_reps: Vec<BodyRep>,
    pub attachments: Vec<AttachmentInfo>,
    pub related_parts: Vec<AttachmentInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Disposition {
    Inline,
    Attachment,
}

/// Size of the decoded payload. Base64 fits 57 bytes into a 78 character
/// line; everything else is taken as is.
fn estimate_size(part: &LeafPart) -> u64 {
    let size = u64::from(part.size);
    if part.encoding == "base64" {
        size * 57 / 78
    } else {
        size
    }
}

fn filename(part: &LeafPart) -> Option<String> {
    if let Some(name) = part.param("name") {
        Some(decode_words(name))
    } else if let Some(name) = part.param("name*") {
        decode_rfc2231(name)
    } else if let Some(name) = part.disposition_param("filename") {
        Some(decode_words(name))
    } else {
        part.disposition_param("filename*").and_then(decode_rfc2231)
    }
}

fn disposition(part: &LeafPart, filename: Option<&str>, parent: Option<&str>) -> Disposition {
    let is_text = part.ty == "text";
    let explicit = part.disposition.as_ref().map(|disposition| disposition.ty.as_str());
    let disposition = match explicit {
        Some("inline") if is_text || part.content_id.is_some() => Disposition::Inline,
        Some("inline" | "attachment") => Disposition::Attachment,
        Some(_) => Disposition::Inline,
        None if parent == Some("related") && part.content_id.is_some() && part.ty == "image" => {
            Disposition::Inline
        }
        None if filename.is_some() || !is_text => Disposition::Attachment,
        None => Disposition::Inline,
    };

    if is_text || part.ty == "image" {
        disposition
    } else {
        Disposition::Attachment
    }
}

struct Chewer {
    chewed: ChewedStructure,
    unnamed: usize,
}

impl Chewer {
    fn attachment(&mut self, part: &LeafPart, filename: Option<String>) -> AttachmentInfo {
        let name = filename.unwrap_or_else(|| {
            self.unnamed += 1;
            format!("unnamed-{}", self.unnamed)
        });
        AttachmentInfo {
            name,
            content_id: part
                .content_id
                .as_deref()
                .map(|id| strip_arrows(id).to_string()),
            ty: format!("{}/{}", part.ty, part.subtype),
            part: part.part_id.clone(),
            encoding: part.encoding.clone(),
            size_estimate: estimate_size(part),
            file: None,
        }
    }

    fn body_rep(part: &LeafPart, kind: BodyKind) -> BodyRep {
        let size = u64::from(part.size);
        BodyRep {
            kind,
            part: part.part_id.clone(),
            size_estimate: size,
            amount_downloaded: 0,
            is_downloaded: size == 0,
            part_info: (size > 0).then(|| PartFetchInfo {
                part_id: part.part_id.clone(),
                ty: part.ty.clone(),
                subtype: part.subtype.clone(),
                params: part.params.clone(),
                encoding: part.encoding.clone(),
            }),
        }
    }

    fn part(&mut self, part: &BodyPart, parent: Option<&str>) -> bool {
        match part {
            BodyPart::Multipart(multipart) => self.multipart(multipart),
            BodyPart::Leaf(leaf) => self.leaf(leaf, parent),
        }
    }

    fn multipart(&mut self, multipart: &MultipartPart) -> bool {
        match multipart.subtype.as_str() {
            // the last alternative is the richest one
            "alternative" => multipart.children.iter().rev().any(|child| match child {
                BodyPart::Multipart(_) => self.part(child, None),
                BodyPart::Leaf(leaf)
                    if leaf.ty == "text" && matches!(leaf.subtype.as_str(), "plain" | "html") =>
                {
                    self.leaf(leaf, None);
                    true
                }
                BodyPart::Leaf(_) => false,
            }),
            "mixed" | "signed" | "related" => {
                for child in &multipart.children {
                    self.part(child, Some(&multipart.subtype));
                }
                true
            }
            other => {
                warn!("ignoring multipart/{other}");
                false
            }
        }
    }

    fn leaf(&mut self, part: &LeafPart, parent: Option<&str>) -> bool {
        let filename = filename(part);
        let disposition = disposition(part, filename.as_deref(), parent);

        if part.ty == "application"
            && matches!(part.subtype.as_str(), "pgp-signature" | "pkcs7-signature")
        {
            return true;
        }

        if disposition == Disposition::Attachment {
            let attachment = self.attachment(part, filename);
            self.chewed.attachments.push(attachment);
            return true;
        }

        match (part.ty.as_str(), part.subtype.as_str()) {
            ("image", _) => {
                let related = self.attachment(part, filename);
                self.chewed.related_parts.push(related);
                true
            }
            ("text", "plain") => {
                self.chewed
                    .body_reps
                    .push(Self::body_rep(part, BodyKind::Plain));
                true
            }
            ("text", "html") => {
                self.chewed
                    .body_reps
                    .push(Self::body_rep(part, BodyKind::Html));
                true
            }
            _ => false,
        }
    }
}

/// Sorts the MIME tree into body reps, attachments and related parts.
pub fn chew_structure(structure: &BodyPart) -> ChewedStructure {
    let mut chewer = Chewer {
        chewed: ChewedStructure::default(),
        unnamed: 0,
    };
    chewer.part(structure, None);
    chewer.chewed
}
