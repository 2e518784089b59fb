//! Breaking boxes across pages, columns and lines.
//!
//! [CSS Fragmentation Module Level 3](https://www.w3.org/TR/css-break-3/)
//!
//! "the process of breaking the content of a box [...] into pieces that fit
//! into fragmentation containers." Only composites break, and only along
//! their tiling axis; every other request returns the box unchanged, as a
//! borrowed [`Cow`].

use std::borrow::Cow;
use std::ops::Range;

use tessera_style::PageBreak;

use crate::layout_box::{Axis, BoxKind, LayoutBox, intersects};

/// How good a break opportunity is. Higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BreakWeight(i32);

impl BreakWeight {
    /// Breaking here is not allowed.
    pub const REFUSE: Self = Self(i32::MIN);
    /// Breaking here is possible but poor.
    pub const BAD: Self = Self(0);
    /// An ordinary break opportunity.
    pub const GOOD: Self = Self(1000);
    /// A preferred break opportunity, such as a word boundary.
    pub const EXCELLENT: Self = Self(2000);
    /// A break must happen here.
    pub const FORCED: Self = Self(3000);

    /// The raw weight.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl LayoutBox {
    /// How good a break would be inside this box when `len` of space is
    /// available from position `pos` along `axis`.
    ///
    /// [§ 4.4 Unforced breaks](https://www.w3.org/TR/css-break-3/#unforced-breaks)
    #[must_use]
    pub fn break_weight(&self, axis: Axis, pos: f32, len: f32) -> BreakWeight {
        if self.axis() != Some(axis) {
            return self.leaf_break_weight(axis, len);
        }

        // [§ 3.1 Breaks Between Boxes](https://www.w3.org/TR/css-break-3/#break-between)
        //
        // "avoid: Avoid any break [...] immediately after the principal box."
        if self.style().page_break_after == PageBreak::Avoid && len > self.preferred_span(axis) {
            return BreakWeight::REFUSE;
        }

        let (leading, _) = self.insets(axis);
        let mut remaining = len - leading;
        let mut at = pos + leading;
        let mut best = BreakWeight::BAD;
        for (index, child) in self.children().iter().enumerate() {
            if remaining <= 0.0 {
                break;
            }
            // "always: Always force a break before the principal box."
            let weight = if index > 0 && child.style().page_break_before == PageBreak::Always {
                BreakWeight::FORCED
            } else {
                child.break_weight(axis, at, remaining)
            };
            best = best.max(weight);
            let span = child.preferred_span(axis);
            remaining -= span;
            at += span;
        }
        best
    }

    fn leaf_break_weight(&self, axis: Axis, len: f32) -> BreakWeight {
        if self.kind() == BoxKind::PageBreak && axis == Axis::Y {
            return BreakWeight::FORCED;
        }
        if len > self.preferred_span(axis) {
            BreakWeight::GOOD
        } else {
            BreakWeight::BAD
        }
    }

    /// Returns true if this box can be split along `axis`.
    #[must_use]
    pub fn can_break(&self, axis: Axis) -> bool {
        self.axis() == Some(axis) && self.is_rendered() && !self.children().is_empty()
    }

    /// Cut the piece of this box that starts at character `offset` and fits
    /// in `len` along `axis`.
    ///
    /// Children are taken in order while they fit, less the trailing inset;
    /// at least one child is always taken so that repeated calls make
    /// progress. A child that straddles `offset` or does not fit is itself
    /// broken. A child with no characters that follows taken content joins
    /// this piece even past `len`. `pos` is the position of the piece along
    /// `axis`.
    ///
    /// Boxes that cannot break, and requests whose piece would be the whole
    /// box, return the box itself.
    #[must_use]
    pub fn break_box(&self, axis: Axis, offset: usize, pos: f32, len: f32) -> Cow<'_, Self> {
        if !self.can_break(axis) {
            return self.unchanged();
        }
        let whole = self.whole_ref();
        let own = self.range();
        let start = offset.clamp(own.start, own.end);
        let first = start <= whole.range.start;

        let (leading, trailing) = self.insets(axis);
        let available = len - if first { leading } else { 0.0 } - trailing;

        let mut taken: Vec<Self> = Vec::new();
        let mut used = 0.0;
        // Once set, only content without characters may join this piece.
        let mut closed = false;
        for child in self.children() {
            let child_range = child.range();
            if self.placed_before(child, start) {
                continue;
            }
            if !taken.is_empty() && child.style().page_break_before == PageBreak::Always {
                break;
            }
            // Content without characters stays with the piece that reaches it.
            let trailing_empty = child_range.is_empty() && !taken.is_empty();
            if closed && !trailing_empty {
                break;
            }
            let piece = if child_range.start < start {
                child.create_fragment(start, child_range.end)
            } else {
                Cow::Borrowed(child)
            };
            let span = piece.preferred_span(axis);
            let room = available - used;
            let forced_after = piece.kind() == BoxKind::PageBreak
                || piece.style().page_break_after == PageBreak::Always;
            if span <= room || trailing_empty {
                used += span;
                taken.push(piece.into_owned());
                closed |= forced_after;
                continue;
            }

            log::trace!(
                target: "tessera::fragment",
                "{} box of node {} breaks at child of node {}",
                self.kind().name(),
                self.node().owner().0,
                child.node().owner().0
            );
            if !taken.is_empty() {
                if room > 0.0 && piece.can_break(axis) {
                    let cut = piece.break_box(axis, piece.range().start, pos + used, room);
                    if cut.is_fragment() && !cut.children().is_empty() && cut.preferred_span(axis) <= room
                    {
                        taken.push(cut.into_owned());
                    }
                }
                break;
            }

            // Nothing taken yet: take this child anyway, broken if it can be.
            let cut = if piece.can_break(axis) {
                piece
                    .break_box(axis, piece.range().start, pos + used, room.max(0.0))
                    .into_owned()
            } else {
                piece.into_owned()
            };
            let complete = cut.is_last_fragment();
            used += span;
            taken.push(cut);
            if !complete {
                break;
            }
            closed = true;
        }

        let end = taken.last().map_or(start, |child| child.range().end.max(start));
        let last = end >= whole.range.end;
        if first && last && !self.is_fragment() {
            return self.unchanged();
        }
        Cow::Owned(self.fragment_of(taken, start..end, first, last))
    }

    /// Returns true if `child` belongs to a piece ending at or before
    /// `start`.
    ///
    /// A child with an empty range at `start` went with the previous piece,
    /// unless `start` is where this box begins or the child forces a break
    /// before itself.
    fn placed_before(&self, child: &Self, start: usize) -> bool {
        let range = child.range();
        if range.end > start {
            return false;
        }
        if range.start < start {
            return true;
        }
        start > self.range().start && child.style().page_break_before != PageBreak::Always
    }

    /// The part of this box covering characters `[p0, p1)`.
    ///
    /// A range covering the whole box returns the box itself. Otherwise the
    /// result is a fragment holding the intersecting children, with children
    /// that only partly intersect fragmented in turn.
    #[must_use]
    pub fn create_fragment(&self, p0: usize, p1: usize) -> Cow<'_, Self> {
        let own = self.range();
        if p0 <= own.start && p1 >= own.end {
            return self.unchanged();
        }
        if !self.is_composite() {
            return self.unchanged();
        }
        let lo = p0.max(own.start);
        let window = lo..p1.min(own.end).max(lo);
        let children = self
            .children()
            .iter()
            .filter(|child| intersects(&child.range(), &window))
            .map(|child| child.create_fragment(window.start, window.end).into_owned())
            .collect();
        let whole = self.whole_ref();
        let first = window.start <= whole.range.start;
        let last = window.end >= whole.range.end;
        Cow::Owned(self.fragment_of(children, window, first, last))
    }

    /// A copy of this box presented as a fragment with the given flags.
    ///
    /// The copy refers to the same whole box as this one: a view of a
    /// fragment points at the original whole box, never at the fragment.
    #[must_use]
    pub fn create_fragment_view(&self, first: bool, last: bool) -> Self {
        self.fragment_of(self.children().to_vec(), self.range(), first, last)
    }

    /// Split this box into consecutive pieces no longer than `page_len` along
    /// `axis`, in document order.
    ///
    /// [§ 2 Introduction to Fragmentation](https://www.w3.org/TR/css-break-3/#fragmentation-model)
    ///
    /// A box that cannot break comes back as the only piece.
    #[must_use]
    pub fn paginate(&self, axis: Axis, page_len: f32) -> Vec<Self> {
        let Range { start, end } = self.range();
        let mut pages = Vec::new();
        let mut offset = start;
        loop {
            let piece = self.break_box(axis, offset, 0.0, page_len);
            let Cow::Owned(piece) = piece else {
                pages.push(self.clone());
                break;
            };
            let next = piece.range().end;
            let done = piece.is_last_fragment() || next <= offset;
            pages.push(piece);
            if done || next >= end {
                break;
            }
            offset = next;
        }
        log::debug!(
            target: "tessera::fragment",
            "paginated {} box of node {} into {} pieces",
            self.kind().name(),
            self.node().owner().0,
            pages.len()
        );
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_are_ordered() {
        assert!(BreakWeight::REFUSE < BreakWeight::BAD);
        assert!(BreakWeight::BAD < BreakWeight::GOOD);
        assert!(BreakWeight::GOOD < BreakWeight::EXCELLENT);
        assert!(BreakWeight::EXCELLENT < BreakWeight::FORCED);
        assert_eq!(BreakWeight::FORCED.value(), 3000);
    }
}
