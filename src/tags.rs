use eframe::egui::Pos2;
use serde::Deserialize;

pub type TagId = i64;
pub type UserId = i64;
pub type PhotoId = i64;

/// Side length of the box stored for a single click.
pub const TAG_BOX_SIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl TagBox {
    /// Parses the server's `"x1,y1,x2,y2"` form. Anything that is not
    /// exactly four integers yields `None`.
    pub fn parse(coords: &str) -> Option<Self> {
        let mut parts = coords.split(',');
        let mut next = || parts.next()?.trim().parse::<i32>().ok();
        let parsed = Self {
            x1: next()?,
            y1: next()?,
            x2: next()?,
            y2: next()?,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(parsed)
    }

    /// The fixed-size box centered on a clicked point, corners rounded to
    /// whole pixels.
    pub fn around(point: Pos2) -> Self {
        let half = TAG_BOX_SIZE / 2.0;
        Self {
            x1: (point.x - half).round() as i32,
            y1: (point.y - half).round() as i32,
            x2: (point.x + half).round() as i32,
            y2: (point.y + half).round() as i32,
        }
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(
            (self.x1 + self.x2) as f32 / 2.0,
            (self.y1 + self.y2) as f32 / 2.0,
        )
    }

    pub fn coords_string(&self) -> String {
        format!("{},{},{},{}", self.x1, self.y1, self.x2, self.y2)
    }
}

/// One stored tag, mirroring the server row. `coords` stays in wire form:
/// the server may hold shapes and coordinate strings this client never
/// produces, and those must survive a round trip untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub user_id: UserId,
    pub user_name: String,
    pub shape: String,
    pub coords: String,
}

impl Tag {
    pub fn bbox(&self) -> Option<TagBox> {
        TagBox::parse(&self.coords)
    }

    /// Where the marker for this tag sits, in image coordinates. `None`
    /// for unparseable coords; such tags get no marker but keep their
    /// list entry.
    pub fn marker_pos(&self) -> Option<Pos2> {
        self.bbox().map(|b| b.center())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::pos2;

    #[test]
    fn parse_accepts_four_integers() {
        let b = TagBox::parse("0,0,20,20").unwrap();
        assert_eq!(
            b,
            TagBox {
                x1: 0,
                y1: 0,
                x2: 20,
                y2: 20
            }
        );
        assert_eq!(b.center(), pos2(10.0, 10.0));
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        let b = TagBox::parse(" 90, 90 ,110,110 ").unwrap();
        assert_eq!(b.coords_string(), "90,90,110,110");
    }

    #[test]
    fn parse_rejects_wrong_arity_and_junk() {
        assert_eq!(TagBox::parse("1,2,3"), None);
        assert_eq!(TagBox::parse("1,2,3,4,5"), None);
        assert_eq!(TagBox::parse("a,b,c,d"), None);
        assert_eq!(TagBox::parse(""), None);
    }

    #[test]
    fn around_builds_the_fixed_box() {
        let b = TagBox::around(pos2(100.0, 100.0));
        assert_eq!(b.coords_string(), "90,90,110,110");
    }

    #[test]
    fn around_rounds_fractional_clicks() {
        let b = TagBox::around(pos2(100.4, 99.6));
        assert_eq!(b.coords_string(), "90,90,110,110");
    }

    #[test]
    fn odd_box_centers_on_the_half_pixel() {
        let b = TagBox::parse("0,0,21,21").unwrap();
        assert_eq!(b.center(), pos2(10.5, 10.5));
    }

    #[test]
    fn malformed_tag_has_no_marker() {
        let tag = Tag {
            id: 1,
            user_id: 2,
            user_name: "Someone".into(),
            shape: "poly".into(),
            coords: "1,2,3".into(),
        };
        assert_eq!(tag.marker_pos(), None);
    }
}
