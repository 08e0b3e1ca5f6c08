//! The `Tag` object is an annotated tag pointing at another object (almost always a commit),
//! carrying a tagger signature and a message. VSS labels applied to a whole project are
//! translated into annotated tags rather than lightweight refs so the labeling author and
//! timestamp survive the conversion.

use std::fmt::Display;
use std::str::FromStr;

use bincode::{Decode, Encode};
use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::object::ObjectTrait;
use crate::internal::object::signature::Signature;
use crate::internal::object::types::ObjectType;

#[derive(Eq, Debug, Clone, Serialize, Deserialize, Decode, Encode)]
pub struct Tag {
    pub id: ObjectHash,
    pub object: ObjectHash,
    pub object_type: ObjectType,
    pub tag_name: String,
    pub tagger: Signature,
    pub message: String,
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "object {}", self.object)?;
        writeln!(f, "type {}", self.object_type)?;
        writeln!(f, "tag {}", self.tag_name)?;
        writeln!(f, "tagger {}", self.tagger)?;
        write!(f, "{}", self.message)
    }
}

impl Tag {
    pub fn new(
        object: ObjectHash,
        object_type: ObjectType,
        tag_name: String,
        tagger: Signature,
        message: String,
    ) -> Tag {
        let mut tag = Tag {
            id: ObjectHash::default(),
            object,
            object_type,
            tag_name,
            tagger,
            message,
        };
        let hash = ObjectHash::from_type_and_data(ObjectType::Tag, &tag.to_data().unwrap());
        tag.id = hash;
        tag
    }
}

impl ObjectTrait for Tag {
    fn from_bytes(data: &[u8], hash: ObjectHash) -> Result<Self, GitError>
    where
        Self: Sized,
    {
        let mut rest = data;

        let object_end = rest
            .find_byte(0x0a)
            .ok_or_else(|| GitError::InvalidTagObject("missing object line".to_owned()))?;
        let object = ObjectHash::from_str(
            rest[7..object_end] // "object "
                .to_str()
                .map_err(|e| GitError::InvalidTagObject(e.to_string()))?,
        )
        .map_err(GitError::InvalidTagObject)?;
        rest = &rest[object_end + 1..];

        let type_end = rest
            .find_byte(0x0a)
            .ok_or_else(|| GitError::InvalidTagObject("missing type line".to_owned()))?;
        let object_type = ObjectType::from_string(
            rest[5..type_end] // "type "
                .to_str()
                .map_err(|e| GitError::InvalidTagObject(e.to_string()))?,
        )?;
        rest = &rest[type_end + 1..];

        let tag_end = rest
            .find_byte(0x0a)
            .ok_or_else(|| GitError::InvalidTagObject("missing tag line".to_owned()))?;
        let tag_name = rest[4..tag_end] // "tag "
            .to_str()
            .map_err(|e| GitError::InvalidTagObject(e.to_string()))?
            .to_owned();
        rest = &rest[tag_end + 1..];

        let tagger_end = rest
            .find_byte(0x0a)
            .ok_or_else(|| GitError::InvalidTagObject("missing tagger line".to_owned()))?;
        let tagger = Signature::from_data(rest[..tagger_end].to_vec())
            .map_err(|e| GitError::InvalidTagObject(e.to_string()))?;
        rest = &rest[tagger_end + 1..];

        // A blank line separates the header block from the message.
        let message = if let Some(blank) = rest.find_byte(0x0a) {
            if rest[..blank].is_empty() {
                rest[blank + 1..].to_str_lossy().into_owned()
            } else {
                rest.to_str_lossy().into_owned()
            }
        } else {
            rest.to_str_lossy().into_owned()
        };

        Ok(Tag {
            id: hash,
            object,
            object_type,
            tag_name,
            tagger,
            message,
        })
    }

    fn get_type(&self) -> ObjectType {
        ObjectType::Tag
    }

    fn to_data(&self) -> Result<Vec<u8>, GitError> {
        let mut data = Vec::new();
        data.extend(b"object ");
        data.extend(self.object.to_string().as_bytes());
        data.push(0x0a);
        data.extend(b"type ");
        data.extend(self.object_type.to_string().as_bytes());
        data.push(0x0a);
        data.extend(b"tag ");
        data.extend(self.tag_name.as_bytes());
        data.push(0x0a);
        data.extend(self.tagger.to_data()?);
        data.push(0x0a);
        data.push(0x0a);
        data.extend(self.message.as_bytes());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashKind, set_hash_kind_for_test};

    fn tagger() -> Signature {
        Signature::from_data(b"tagger mega <admin@mega.org> 1700000000 +0800".to_vec()).unwrap()
    }

    #[test]
    fn new_computes_hash_and_round_trips() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let object = ObjectHash::from_type_and_data(ObjectType::Commit, b"fake commit");
        let tag = Tag::new(
            object,
            ObjectType::Commit,
            "release-1.0".to_owned(),
            tagger(),
            "first release\n".to_owned(),
        );
        let data = tag.to_data().unwrap();
        let parsed = Tag::from_bytes(&data, tag.id).unwrap();
        assert_eq!(parsed.tag_name, "release-1.0");
        assert_eq!(parsed.object, tag.object);
        assert_eq!(parsed.message, "first release\n");
    }
}
