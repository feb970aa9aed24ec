use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::Result;
use crate::graph::{GraphView, Side};
use crate::store::CountingStore;
use crate::util::kmer::Kmer;

/// 单向游走的终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// 过滤后没有候选
    DeadEnd,
    /// 过滤后仍有 ≥ 2 个候选
    Branch,
    /// 唯一候选已在本次游走中出现过
    Cycle,
}

/// 单向游走结果：`bases` 按游走顺序记录每一步新增的碱基
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub bases: Vec<u8>,
    pub end: WalkEnd,
}

/// 贪心双向游走，输出经过种子 k-mer 的最长无分支路径。
///
/// 每一步只看当前所在 k-mer 在行进方向上的候选：先从存在的扩展中剔除
/// blocker 命中的 k-mer，剩下恰好一个才前进。分支判定总是局部的，
/// 已经走过的 HDN 不会影响后续步骤。
#[derive(Debug, Clone, Copy)]
pub struct LinearAssembler<'a> {
    graph: GraphView<'a>,
}

impl<'a> LinearAssembler<'a> {
    pub fn new(graph: GraphView<'a>) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> GraphView<'a> {
        self.graph
    }

    /// 从 `seed` 向 `side` 一侧游走，直到死端、分支或成环。
    pub fn walk(&self, seed: &Kmer, side: Side, blocker: Option<&CountingStore>) -> Walk {
        let k = self.graph.ksize();
        let mut visited: HashSet<u64> = HashSet::new();
        visited.insert(seed.canonical());

        let mut cursor = *seed;
        let mut bases = Vec::new();
        let end = loop {
            let candidates: Vec<Kmer> = self
                .graph
                .neighbors(&cursor, side)
                .into_iter()
                .filter(|nb| !blocker.is_some_and(|b| b.contains(nb)))
                .collect();

            let next = match candidates.as_slice() {
                [only] => *only,
                [] => break WalkEnd::DeadEnd,
                _ => break WalkEnd::Branch,
            };
            if !visited.insert(next.canonical()) {
                break WalkEnd::Cycle;
            }
            let base = match side {
                Side::Left => next.first_base(k),
                Side::Right => next.last_base(),
            };
            trace!(base = %(base as char), ?side, "step");
            bases.push(base);
            cursor = next;
        };

        debug!(?side, steps = bases.len(), ?end, "walk finished");
        Walk { bases, end }
    }

    /// 双向组装；种子 k-mer 只出现一次。
    ///
    /// 环状输入上左右两个方向都会绕环一周，结果是环序列重复近两遍。
    pub fn assemble(&self, seed: &str, blocker: Option<&CountingStore>) -> Result<String> {
        let Some(seed) = self.start(seed, blocker)? else {
            return Ok(String::new());
        };
        let left = self.walk(&seed, Side::Left, blocker);
        let right = self.walk(&seed, Side::Right, blocker);

        let mut contig = Vec::with_capacity(left.bases.len() + self.graph.ksize() + right.bases.len());
        contig.extend(left.bases.iter().rev());
        contig.extend(seed.to_bases(self.graph.ksize()));
        contig.extend(&right.bases);
        Ok(into_string(contig))
    }

    /// 只向左组装，结果以种子结尾。
    pub fn assemble_left(&self, seed: &str, blocker: Option<&CountingStore>) -> Result<String> {
        let Some(seed) = self.start(seed, blocker)? else {
            return Ok(String::new());
        };
        let walk = self.walk(&seed, Side::Left, blocker);
        let mut contig: Vec<u8> = walk.bases.into_iter().rev().collect();
        contig.extend(seed.to_bases(self.graph.ksize()));
        Ok(into_string(contig))
    }

    /// 只向右组装，结果以种子开头。
    pub fn assemble_right(&self, seed: &str, blocker: Option<&CountingStore>) -> Result<String> {
        let Some(seed) = self.start(seed, blocker)? else {
            return Ok(String::new());
        };
        let walk = self.walk(&seed, Side::Right, blocker);
        let mut contig = seed.to_bases(self.graph.ksize());
        contig.extend(walk.bases);
        Ok(into_string(contig))
    }

    /// 校验 blocker 的 K 并解析种子；种子不在图中时返回 None（空 contig）。
    fn start(&self, seed: &str, blocker: Option<&CountingStore>) -> Result<Option<Kmer>> {
        if let Some(b) = blocker {
            self.graph.store().check_compatible(b)?;
        }
        let kmer = self.graph.store().kmer(seed)?;
        if !self.graph.contains(&kmer) {
            debug!(seed, "seed k-mer is not in the graph");
            return Ok(None);
        }
        Ok(Some(kmer))
    }
}

fn into_string(bases: Vec<u8>) -> String {
    bases.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::testutil::*;
    use crate::util::dna::reverse_complement;

    #[test]
    fn all_start_positions() {
        let mut gen = SeqGen::new(1);
        let (store, contig) = linear_structure(&mut gen, 1000);
        let asm = LinearAssembler::new(GraphView::new(&store));

        for start in (0..=contig.len() - K).step_by(150) {
            let path = asm.assemble(&contig[start..start + K], None).unwrap();
            assert_eq!(path, contig, "start = {}", start);
        }
    }

    #[test]
    fn all_left_to_beginning() {
        let mut gen = SeqGen::new(2);
        let (store, contig) = linear_structure(&mut gen, 1000);
        let asm = LinearAssembler::new(GraphView::new(&store));

        for start in (0..=contig.len() - K).step_by(150) {
            let path = asm.assemble_left(&contig[start..start + K], None).unwrap();
            assert_eq!(path, &contig[..start + K], "start = {}", start);
        }
    }

    #[test]
    fn all_right_to_end() {
        let mut gen = SeqGen::new(3);
        let (store, contig) = linear_structure(&mut gen, 1000);
        let asm = LinearAssembler::new(GraphView::new(&store));

        for start in (0..=contig.len() - K).step_by(150) {
            let path = asm.assemble_right(&contig[start..start + K], None).unwrap();
            assert_eq!(path, &contig[start..], "start = {}", start);
        }
    }

    #[test]
    fn reverse_complement_seed_gives_reverse_complement_path() {
        let mut gen = SeqGen::new(4);
        let (store, contig) = linear_structure(&mut gen, 600);
        let asm = LinearAssembler::new(GraphView::new(&store));

        for start in [0, 17, 300, contig.len() - K] {
            let seed = &contig[start..start + K];
            let fwd = asm.assemble(seed, None).unwrap();
            let rev = asm.assemble(&reverse_complement(seed), None).unwrap();
            assert_eq!(rev, reverse_complement(&fwd));
        }
    }

    #[test]
    fn circular_walk_stops_before_repeating() {
        let mut gen = SeqGen::new(5);
        let contig = gen.random_sequence(400, &[]);
        let store = presence_store();
        store.consume(&format!("{}{}", contig, &contig[..K - 1])).unwrap();
        let asm = LinearAssembler::new(GraphView::new(&store));

        let path = asm.assemble_right(&contig[..K], None).unwrap();
        assert_eq!(path.len(), contig.len() + K - 1);
        assert!(path.starts_with(&contig));

        let seed = store.kmer(&contig[..K]).unwrap();
        assert_eq!(asm.walk(&seed, Side::Right, None).end, WalkEnd::Cycle);
    }

    #[test]
    fn circular_assembly_walks_the_cycle_both_ways() {
        let mut gen = SeqGen::new(5);
        let contig = gen.random_sequence(400, &[]);
        let store = presence_store();
        store.consume(&format!("{}{}", contig, &contig[..K - 1])).unwrap();
        let asm = LinearAssembler::new(GraphView::new(&store));

        let path = asm.assemble(&contig[..K], None).unwrap();
        assert_eq!(path.len(), 2 * contig.len() + K - 2);
        assert!(path.contains(&contig));
        assert!(path.starts_with(&contig[1..]));
    }

    #[test]
    fn absent_seed_yields_empty_contig() {
        let mut gen = SeqGen::new(6);
        let (store, contig) = linear_structure(&mut gen, 200);
        let asm = LinearAssembler::new(GraphView::new(&store));
        let other = gen.random_sequence(K, &[&contig]);
        assert_eq!(asm.assemble(&other, None).unwrap(), "");
    }

    #[test]
    fn seed_must_be_exactly_k() {
        let mut gen = SeqGen::new(7);
        let (store, contig) = linear_structure(&mut gen, 200);
        let asm = LinearAssembler::new(GraphView::new(&store));
        assert!(matches!(asm.assemble(&contig[..K - 1], None), Err(GraphError::TooShort { .. })));
        assert!(matches!(
            asm.assemble(&contig[..K + 1], None),
            Err(GraphError::InvalidParameter(_))
        ));
    }

    #[test]
    fn blocker_with_different_k_is_rejected() {
        let mut gen = SeqGen::new(8);
        let (store, contig) = linear_structure(&mut gen, 200);
        let asm = LinearAssembler::new(GraphView::new(&store));
        let blocker = CountingStore::presence(K - 2, 1_000, 2).unwrap();
        assert!(matches!(
            asm.assemble(&contig[..K], Some(&blocker)),
            Err(GraphError::IncompatibleParameters(_))
        ));
    }

    #[test]
    fn unrelated_blocker_does_not_change_a_linear_contig() {
        let mut gen = SeqGen::new(9);
        let (store, contig) = linear_structure(&mut gen, 500);
        let asm = LinearAssembler::new(GraphView::new(&store));
        let blocker = presence_store();
        blocker.consume(&gen.random_sequence(300, &[&contig])).unwrap();
        assert_eq!(asm.assemble(&contig[200..200 + K], Some(&blocker)).unwrap(), contig);
    }

    // ── 右侧分支 ──────────────────────────────────────

    #[test]
    fn right_branch_point_has_degree_three() {
        let t = right_tip_structure(&mut SeqGen::new(10));
        let g = GraphView::new(&t.store);
        assert_eq!(g.kmer_degree(&t.store.kmer(&t.hdn).unwrap()), 3);
    }

    #[test]
    fn beginning_to_branch() {
        let t = right_tip_structure(&mut SeqGen::new(11));
        let asm = LinearAssembler::new(GraphView::new(&t.store));

        let path = asm.assemble(&t.contig[..K], None).unwrap();
        assert_eq!(path.len(), t.hdn_pos + K);
        assert_eq!(path, &t.contig[..path.len()]);

        let path = asm.assemble(&reverse_complement(&t.contig[..K]), None).unwrap();
        assert_eq!(path.len(), t.hdn_pos + K);
        assert_eq!(path, reverse_complement(&t.contig[..t.hdn_pos + K]));
    }

    #[test]
    fn left_of_branch_to_beginning() {
        let t = right_tip_structure(&mut SeqGen::new(12));
        let asm = LinearAssembler::new(GraphView::new(&t.store));

        let path = asm.assemble(&t.l, None).unwrap();
        assert_eq!(path, &t.contig[..t.hdn_pos + K]);

        let path = asm.assemble(&reverse_complement(&t.l), None).unwrap();
        assert_eq!(path, reverse_complement(&t.contig[..t.hdn_pos + K]));
    }

    #[test]
    fn right_of_branch_outwards_to_ends() {
        // 从 R 出发向左时分支在身后，不构成阻碍
        let t = right_tip_structure(&mut SeqGen::new(13));
        let asm = LinearAssembler::new(GraphView::new(&t.store));
        assert_eq!(asm.assemble(&t.r, None).unwrap(), t.contig);
        assert_eq!(asm.assemble(&t.contig[t.contig.len() - K..], None).unwrap(), t.contig);
    }

    // ── 左侧分支 ──────────────────────────────────────

    #[test]
    fn left_branch_point_has_degree_three() {
        let t = left_tip_structure(&mut SeqGen::new(14));
        let g = GraphView::new(&t.store);
        let hdn = t.store.kmer(&t.hdn).unwrap();
        assert_eq!(g.kmer_degree(&hdn), 3);
        assert_eq!(g.degree(&hdn, Side::Left), 2);
    }

    #[test]
    fn end_to_branch_includes_hdn() {
        let t = left_tip_structure(&mut SeqGen::new(15));
        let asm = LinearAssembler::new(GraphView::new(&t.store));
        let path = asm.assemble(&t.contig[t.contig.len() - K..], None).unwrap();
        assert_eq!(path.len(), t.contig.len() - t.hdn_pos);
        assert_eq!(path, &t.contig[t.hdn_pos..]);
    }

    #[test]
    fn branch_to_end() {
        let t = left_tip_structure(&mut SeqGen::new(16));
        let asm = LinearAssembler::new(GraphView::new(&t.store));
        let path = asm.assemble(&t.hdn, None).unwrap();
        assert_eq!(path, &t.contig[t.hdn_pos..]);
    }

    #[test]
    fn blocking_the_tip_recovers_full_contig() {
        let t = left_tip_structure(&mut SeqGen::new(17));
        let blocker = presence_store();
        blocker.count(&t.tip).unwrap();
        let asm = LinearAssembler::new(GraphView::new(&t.store));

        assert_eq!(asm.assemble(&t.hdn, Some(&blocker)).unwrap(), t.contig);
        assert_eq!(
            asm.assemble(&reverse_complement(&t.hdn), Some(&blocker)).unwrap(),
            reverse_complement(&t.contig)
        );
    }

    #[test]
    fn blocking_the_main_path_detours_through_tip() {
        let t = left_tip_structure(&mut SeqGen::new(18));
        let blocker = presence_store();
        blocker.count(&t.l).unwrap();
        let asm = LinearAssembler::new(GraphView::new(&t.store));

        let path = asm.assemble(&t.contig[t.contig.len() - K..], Some(&blocker)).unwrap();
        assert_eq!(path.len(), t.contig.len() - t.hdn_pos + 1);
        assert_eq!(path, format!("{}{}", t.tip, &t.contig[t.hdn_pos + K - 1..]));
    }

    #[test]
    fn single_node_flanked_by_hdns() {
        let t = left_tip_structure(&mut SeqGen::new(19));
        t.store.consume(&mutate_position(&t.contig, t.hdn_pos + K)).unwrap();
        let asm = LinearAssembler::new(GraphView::new(&t.store));

        let path = asm.assemble(&t.hdn, None).unwrap();
        assert_eq!(path, t.hdn);

        let seed = t.store.kmer(&t.hdn).unwrap();
        assert_eq!(asm.walk(&seed, Side::Left, None).end, WalkEnd::Branch);
        assert_eq!(asm.walk(&seed, Side::Right, None).end, WalkEnd::Branch);
    }
}
