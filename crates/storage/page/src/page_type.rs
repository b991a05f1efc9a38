/// The kind of payload a page's body holds. Stored in the header's `type`
/// field so a page can be interpreted correctly after a cold read.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    DirPage = 10,
    DataPage = 11,
    HashDirPage = 12,
    HashBucketPage = 13,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized page type tag: {0}")]
pub struct UnknownPageType(pub u16);

impl From<PageType> for u16 {
    fn from(value: PageType) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for PageType {
    type Error = UnknownPageType;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(PageType::DirPage),
            11 => Ok(PageType::DataPage),
            12 => Ok(PageType::HashDirPage),
            13 => Ok(PageType::HashBucketPage),
            other => Err(UnknownPageType(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u16() {
        for pt in [
            PageType::DirPage,
            PageType::DataPage,
            PageType::HashDirPage,
            PageType::HashBucketPage,
        ] {
            let raw: u16 = pt.into();
            assert_eq!(PageType::try_from(raw).unwrap(), pt);
        }
    }

    #[test]
    fn rejects_unknown_tag() {
        assert_eq!(PageType::try_from(0), Err(UnknownPageType(0)));
    }
}
