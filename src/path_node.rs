// src/path_node.rs

// Path nodes used during prefix doubling.

use bytemuck::{Pod, Zeroable};
use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Read, Write};

use crate::codec::{Key, Node, NodeType};
use crate::kmer::KMer;

/// Integer type for the ranks of the original k-mers.
pub type RankType = u32;

/// Maximum number of k-mer ranks in a label. At least `1 << MAX_DOUBLING_STEPS`.
pub const LABEL_LENGTH: usize = 8;

/// What the `to` field of a [`PathNode`] currently means.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// `to` is the end of the semiopen path range `[from, to)`.
    Range,
    /// `to` holds indegree (upper 32 bits) and outdegree (lower 32 bits).
    DegreeCount,
}

/// Unpacked view of the `fields` word.
///
/// From low-order to high-order bits:
///
/// ```text
/// 8 bits   which predecessor comp values exist
/// 4 bits   order: number of k-mer ranks in the label range
/// 4 bits   lcp of the first and last labels, in ranks
/// 1 bit    phase tag (set in the degree-count phase)
/// 7 bits   unused
/// 40 bits  reserved for a pointer to external label data (not used)
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fields {
    pub predecessors: u8,
    pub order: usize,
    pub lcp: usize,
    pub phase: Phase,
}

impl Fields {
    const ORDER_SHIFT: u64 = 8;
    const LCP_SHIFT: u64 = 12;
    const PHASE_BIT: u64 = 1 << 16;
    const NIBBLE: u64 = 0xF;

    pub fn pack(&self) -> u64 {
        debug_assert!(self.order <= LABEL_LENGTH && self.lcp <= LABEL_LENGTH);
        let mut value = self.predecessors as u64;
        value |= (self.order as u64 & Self::NIBBLE) << Self::ORDER_SHIFT;
        value |= (self.lcp as u64 & Self::NIBBLE) << Self::LCP_SHIFT;
        if self.phase == Phase::DegreeCount {
            value |= Self::PHASE_BIT;
        }
        value
    }

    pub fn unpack(value: u64) -> Self {
        Fields {
            predecessors: (value & 0xFF) as u8,
            order: ((value >> Self::ORDER_SHIFT) & Self::NIBBLE) as usize,
            lcp: ((value >> Self::LCP_SHIFT) & Self::NIBBLE) as usize,
            phase: if value & Self::PHASE_BIT != 0 {
                Phase::DegreeCount
            } else {
                Phase::Range
            },
        }
    }
}

/// The node type used during doubling.
///
/// As in the original GCSA, `from` and `to` are positions in the input graph,
/// denoting a path as a semiopen range `[from, to)`. If `to` is the all-ones
/// sentinel, the path already has a unique label and will not be extended.
///
/// The label of the path is a range of k-mer rank sequences from `first_label`
/// to `last_label`, with `order()` ranks valid in each. If `a.first_label` is a
/// proper prefix of `b.first_label`, `a` sorts first. If `a.last_label` is a
/// proper prefix of `b.last_label`, `a.last_label` is the greater one.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable, PartialEq, Eq, Debug)]
pub struct PathNode {
    pub from: NodeType,
    to: NodeType,
    pub first_label: [RankType; LABEL_LENGTH],
    pub last_label: [RankType; LABEL_LENGTH],
    fields: u64,
}

impl PathNode {
    pub const SORTED: NodeType = !0;
    pub const RECORD_SIZE: usize = std::mem::size_of::<PathNode>();

    /// Order-1 node for a k-mer whose key already carries its rank.
    pub fn from_kmer(kmer: &KMer) -> Self {
        let rank = Key::label(kmer.key) as RankType;
        let mut node = PathNode {
            from: kmer.from,
            to: kmer.to,
            ..PathNode::zeroed()
        };
        node.first_label[0] = rank;
        node.last_label[0] = rank;
        node.set_fields(Fields {
            predecessors: Key::predecessors(kmer.key),
            order: 1,
            lcp: 1,
            phase: Phase::Range,
        });
        node
    }

    /// Joins `left` with the path `right` starting where `left` ends.
    ///
    /// The labels are concatenated up to [`LABEL_LENGTH`] ranks. Returns `None`
    /// if `left` is already at full length and cannot grow.
    pub fn join(left: &PathNode, right: &PathNode) -> Option<PathNode> {
        let left_order = left.order();
        if left_order >= LABEL_LENGTH {
            return None;
        }
        let right_order = right.order().min(LABEL_LENGTH - left_order);
        let order = left_order + right_order;

        let mut node = PathNode {
            from: left.from,
            to: right.to(),
            first_label: [0; LABEL_LENGTH],
            last_label: [0; LABEL_LENGTH],
            fields: 0,
        };
        node.first_label[..left_order].copy_from_slice(&left.first_label[..left_order]);
        node.first_label[left_order..order].copy_from_slice(&right.first_label[..right_order]);
        node.last_label[..left_order].copy_from_slice(&left.last_label[..left_order]);
        node.last_label[left_order..order].copy_from_slice(&right.last_label[..right_order]);

        let lcp = node.label_lcp(order);
        node.set_fields(Fields {
            predecessors: left.predecessors(),
            order,
            lcp,
            phase: Phase::Range,
        });
        Some(node)
    }

    fn label_lcp(&self, order: usize) -> usize {
        (0..order)
            .take_while(|&i| self.first_label[i] == self.last_label[i])
            .count()
    }

    //------------------------------------------------------------------------------

    #[inline]
    pub fn fields(&self) -> Fields {
        Fields::unpack(self.fields)
    }

    /// Replaces the packed fields, keeping the reserved bits.
    #[inline]
    pub fn set_fields(&mut self, fields: Fields) {
        const LOW_MASK: u64 = 0x1_FFFF;
        self.fields = (self.fields & !LOW_MASK) | fields.pack();
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.fields().phase
    }

    /// End of the path range.
    ///
    /// # Panics
    ///
    /// Panics in the degree-count phase.
    #[inline]
    pub fn to(&self) -> NodeType {
        assert_eq!(self.phase(), Phase::Range, "PathNode::to(): node is counting degrees");
        self.to
    }

    #[inline]
    pub fn sorted(&self) -> bool {
        self.to() == Self::SORTED
    }

    #[inline]
    pub fn make_sorted(&mut self) {
        assert_eq!(self.phase(), Phase::Range, "PathNode::make_sorted(): node is counting degrees");
        self.to = Self::SORTED;
    }

    #[inline]
    pub fn predecessors(&self) -> u8 {
        (self.fields & 0xFF) as u8
    }

    #[inline]
    pub fn set_predecessors(&mut self, preds: u8) {
        self.fields = (self.fields & !0xFF) | preds as u64;
    }

    #[inline]
    pub fn has_predecessor(&self, comp: u8) -> bool {
        self.fields & (1 << comp) != 0
    }

    #[inline]
    pub fn add_predecessors(&mut self, another: &PathNode) {
        self.fields |= another.predecessors() as u64;
    }

    /// Length of the k-mer rank sequences representing the path label range.
    #[inline]
    pub fn order(&self) -> usize {
        self.fields().order
    }

    pub fn set_order(&mut self, new_order: usize) {
        let mut fields = self.fields();
        fields.order = new_order;
        self.set_fields(fields);
    }

    /// Length of the common prefix of the first and last labels.
    #[inline]
    pub fn lcp(&self) -> usize {
        self.fields().lcp
    }

    pub fn set_lcp(&mut self, new_lcp: usize) {
        let mut fields = self.fields();
        fields.lcp = new_lcp;
        self.set_fields(fields);
    }

    //------------------------------------------------------------------------------

    /// Switches the node to the degree-count phase with both degrees 0.
    /// The path range is lost.
    pub fn init_degree(&mut self) {
        let mut fields = self.fields();
        fields.phase = Phase::DegreeCount;
        self.set_fields(fields);
        self.to = 0;
    }

    fn check_degree_phase(&self) {
        assert_eq!(
            self.phase(),
            Phase::DegreeCount,
            "PathNode: degree access outside the degree-count phase"
        );
    }

    #[inline]
    pub fn increment_outdegree(&mut self) {
        self.check_degree_phase();
        self.to += 1;
    }

    #[inline]
    pub fn outdegree(&self) -> usize {
        self.check_degree_phase();
        (self.to & 0xFFFF_FFFF) as usize
    }

    #[inline]
    pub fn increment_indegree(&mut self) {
        self.check_degree_phase();
        self.to += 1 << 32;
    }

    #[inline]
    pub fn indegree(&self) -> usize {
        self.check_degree_phase();
        (self.to >> 32) as usize
    }

    //------------------------------------------------------------------------------

    /// Can the label ranges of the two nodes overlap, given the ranks recorded so far?
    ///
    /// Ranges whose recorded prefixes agree on the common order always intersect,
    /// because a longer label could still fall inside the shorter range.
    pub fn intersect(&self, another: &PathNode) -> bool {
        let order = self.order().min(another.order());
        !(Self::less_prefix(&self.last_label, &another.first_label, order)
            || Self::less_prefix(&another.last_label, &self.first_label, order))
    }

    fn less_prefix(a: &[RankType], b: &[RankType], order: usize) -> bool {
        match (0..order).find(|&i| a[i] != b[i]) {
            Some(i) => a[i] < b[i],
            None => false,
        }
    }

    fn common_prefix(a: &[RankType], b: &[RankType], order: usize) -> usize {
        (0..order).take_while(|&i| a[i] == b[i]).count()
    }

    /// Minimal lcp of the rank sequences of `self` and `another`, in ranks.
    /// `another` must come after `self`, and the ranges must not overlap.
    pub fn min_lcp(&self, another: &PathNode) -> usize {
        let order = self.order().min(another.order());
        Self::common_prefix(&self.first_label, &another.last_label, order)
    }

    /// Maximal lcp of the rank sequences of `self` and `another`, in ranks.
    /// `another` must come after `self`, and the ranges must not overlap.
    pub fn max_lcp(&self, another: &PathNode) -> usize {
        let order = self.order().min(another.order());
        Self::common_prefix(&self.last_label, &another.first_label, order)
    }

    /// Lexicographic order of the first labels; a proper prefix sorts first.
    pub fn cmp_label(&self, another: &PathNode) -> Ordering {
        let order = self.order().min(another.order());
        self.first_label[..order]
            .cmp(&another.first_label[..order])
            .then(self.order().cmp(&another.order()))
    }

    /// Like `cmp_label() == Less`, but for the last labels. A proper prefix is the greater label.
    pub fn compare_last(&self, another: &PathNode) -> bool {
        let order = self.order().min(another.order());
        match self.last_label[..order].cmp(&another.last_label[..order]) {
            Ordering::Equal => another.order() < self.order(),
            ord => ord == Ordering::Less,
        }
    }

    /// Do the nodes have identical label ranges?
    pub fn same_label(&self, another: &PathNode) -> bool {
        let order = self.order();
        order == another.order()
            && self.first_label[..order] == another.first_label[..order]
            && self.last_label[..order] == another.last_label[..order]
    }

    //------------------------------------------------------------------------------

    /// Writes the node as a fixed-size record. Returns the number of bytes written.
    pub fn serialize<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        out.write_all(bytemuck::bytes_of(self))?;
        Ok(Self::RECORD_SIZE)
    }

    pub fn load<R: Read>(input: &mut R) -> io::Result<Self> {
        let mut node = PathNode::zeroed();
        input.read_exact(bytemuck::bytes_of_mut(&mut node))?;
        Ok(node)
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self.order();
        let end = match self.phase() {
            Phase::Range if self.to == Self::SORTED => String::from("sorted"),
            Phase::Range => Node::decode(self.to),
            Phase::DegreeCount => format!("in {}, out {}", self.indegree(), self.outdegree()),
        };
        write!(
            f,
            "({} -> {}; {:?} to {:?}; order {}, lcp {}, preds {:#04x})",
            Node::decode(self.from),
            end,
            &self.first_label[..order],
            &self.last_label[..order],
            order,
            self.lcp(),
            self.predecessors()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(from: NodeType, to: NodeType, label: &[RankType]) -> PathNode {
        let mut res = PathNode {
            from,
            to,
            ..PathNode::zeroed()
        };
        res.first_label[..label.len()].copy_from_slice(label);
        res.last_label[..label.len()].copy_from_slice(label);
        res.set_fields(Fields {
            predecessors: 0,
            order: label.len(),
            lcp: label.len(),
            phase: Phase::Range,
        });
        res
    }

    #[test]
    fn test_record_size() {
        assert_eq!(PathNode::RECORD_SIZE, 88);
    }

    #[test]
    fn test_fields_roundtrip() {
        let fields = Fields {
            predecessors: 0b1010_0101,
            order: 8,
            lcp: 3,
            phase: Phase::DegreeCount,
        };
        assert_eq!(Fields::unpack(fields.pack()), fields);
    }

    #[test]
    fn test_setters_keep_other_fields() {
        let mut n = node(1, 2, &[4, 5]);
        n.set_predecessors(0b110);
        n.set_lcp(1);
        assert_eq!(n.order(), 2);
        assert_eq!(n.predecessors(), 0b110);
        assert!(n.has_predecessor(1) && n.has_predecessor(2) && !n.has_predecessor(0));
        n.set_order(1);
        assert_eq!(n.lcp(), 1);
        assert_eq!(n.predecessors(), 0b110);
    }

    #[test]
    fn test_join_concatenates_labels() {
        let mut left = node(10, 20, &[3, 1]);
        left.set_predecessors(0b10);
        let right = node(20, 30, &[7, 2]);
        let joined = PathNode::join(&left, &right).unwrap();

        assert_eq!(joined.from, 10);
        assert_eq!(joined.to(), 30);
        assert_eq!(joined.order(), 4);
        assert_eq!(&joined.first_label[..4], &[3, 1, 7, 2]);
        assert_eq!(&joined.last_label[..4], &[3, 1, 7, 2]);
        assert_eq!(joined.predecessors(), 0b10);
        assert_eq!(joined.lcp(), 4);
    }

    #[test]
    fn test_join_truncates_and_freezes() {
        let left = node(1, 2, &[1, 2, 3, 4, 5, 6]);
        let right = node(2, 3, &[7, 8, 9, 10]);
        let joined = PathNode::join(&left, &right).unwrap();
        assert_eq!(joined.order(), LABEL_LENGTH);
        assert_eq!(joined.first_label, [1, 2, 3, 4, 5, 6, 7, 8]);

        assert!(PathNode::join(&joined, &right).is_none());
    }

    #[test]
    fn test_ordering() {
        let a = node(0, 1, &[1, 2]);
        let b = node(0, 1, &[1, 3]);
        let prefix = node(0, 1, &[1]);

        assert_eq!(a.cmp_label(&b), Ordering::Less);
        assert_eq!(prefix.cmp_label(&a), Ordering::Less);
        assert_eq!(a.cmp_label(&a), Ordering::Equal);

        assert!(a.compare_last(&b));
        assert!(a.compare_last(&prefix));
        assert!(!prefix.compare_last(&a));
    }

    #[test]
    fn test_intersect_and_lcp() {
        let a = node(0, 1, &[1, 2, 3]);
        let b = node(0, 1, &[1, 2, 4]);
        let prefix = node(0, 1, &[1, 2]);

        assert!(!a.intersect(&b));
        assert!(a.intersect(&prefix));
        assert!(prefix.intersect(&b));
        assert_eq!(a.max_lcp(&b), 2);
        assert_eq!(a.min_lcp(&b), 2);

        let mut range = node(0, 1, &[1, 0]);
        range.last_label[1] = 5;
        assert!(range.intersect(&b));
        assert!(range.intersect(&a));
        assert!(!range.intersect(&node(0, 1, &[1, 6])));
    }

    #[test]
    fn test_degree_phase() {
        let mut n = node(3, 4, &[1]);
        n.init_degree();
        n.increment_outdegree();
        n.increment_outdegree();
        n.increment_indegree();
        assert_eq!(n.phase(), Phase::DegreeCount);
        assert_eq!(n.outdegree(), 2);
        assert_eq!(n.indegree(), 1);
        assert_eq!(n.order(), 1);
    }

    #[test]
    #[should_panic]
    fn test_range_access_in_degree_phase() {
        let mut n = node(3, 4, &[1]);
        n.init_degree();
        let _ = n.to();
    }

    #[test]
    #[should_panic]
    fn test_degree_access_in_range_phase() {
        let n = node(3, 4, &[1]);
        let _ = n.indegree();
    }

    #[test]
    fn test_serialize_load() {
        let mut n = node(3, 4, &[9, 8, 7]);
        n.set_predecessors(0x11);
        let mut buffer = Vec::new();
        assert_eq!(n.serialize(&mut buffer).unwrap(), PathNode::RECORD_SIZE);
        let loaded = PathNode::load(&mut buffer.as_slice()).unwrap();
        assert_eq!(loaded, n);
    }
}
