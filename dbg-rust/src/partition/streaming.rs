use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};

use super::component::{Component, ComponentId, ComponentRecord};
use super::PartitionParams;
use crate::error::{GraphError, Result};
use crate::graph::{GraphView, Side};
use crate::store::CountingStore;
use crate::util::kmer::{Kmer, KmerIter};

/// 流式组件索引。
///
/// 持有计数表本身：`consume_sequence` 先计数再找标签，保证新序列的 k-mer
/// 在搜索时已经在图中。组件以并查集组织，存活组件是 `parent == 自身` 的根，
/// 标签在合并时整体移交给幸存者，因此每个标签恰好属于一个存活组件。
///
/// 写入需要 `&mut self`，查询只读，可与其他只读者共享。
pub struct ComponentIndex {
    store: CountingStore,
    params: PartitionParams,
    /// 标签 → 最初（或最近一次）分配给它的组件，可能已被合并，查询时经 `find` 归到根
    tag_owner: HashMap<u64, ComponentId>,
    components: Vec<ComponentRecord>,
    n_live: usize,
}

impl ComponentIndex {
    pub fn new(store: CountingStore, params: PartitionParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            store,
            params,
            tag_owner: HashMap::new(),
            components: Vec::new(),
            n_live: 0,
        })
    }

    pub fn with_defaults(store: CountingStore) -> Result<Self> {
        Self::new(store, PartitionParams::default())
    }

    pub fn store(&self) -> &CountingStore {
        &self.store
    }

    pub fn into_store(self) -> CountingStore {
        self.store
    }

    pub fn graph(&self) -> GraphView<'_> {
        GraphView::new(&self.store)
    }

    pub fn params(&self) -> &PartitionParams {
        &self.params
    }

    pub fn ksize(&self) -> usize {
        self.store.ksize()
    }

    /// 存活组件数
    pub fn n_components(&self) -> usize {
        self.n_live
    }

    /// 已采样的标签总数
    pub fn n_tags(&self) -> usize {
        self.tag_owner.len()
    }

    /// 摄入一条序列，返回它最终所属的存活组件。
    ///
    /// 1. 计数序列中所有 k-mer；
    /// 2. 采样标签：首尾 k-mer、每隔 `tag_density` 个 k-mer 一个、以及已经是标签的 k-mer；
    /// 3. 从序列的所有 k-mer 出发，在 `search_radius` 步内找已有标签；
    /// 4. 未触及任何组件则新建，触及一个则加入，触及多个则全部合并到编号最小者；
    /// 5. 新标签归入结果组件。
    pub fn consume_sequence(&mut self, seq: &str) -> Result<ComponentId> {
        let kmers: Vec<Kmer> = KmerIter::new(seq.as_bytes(), self.store.ksize())?.collect();
        for km in &kmers {
            self.store.count_hash(km.canonical());
        }

        let tags = self.sample_tags(&kmers);
        let owners = self.search_tags(&kmers, false);
        let roots: BTreeSet<ComponentId> = owners.into_iter().map(|id| self.find_mut(id)).collect();

        let mut it = roots.iter().copied();
        let target = match (it.next(), it.next()) {
            (None, _) => self.create_component(),
            (Some(only), None) => only,
            (Some(survivor), Some(_)) => {
                let absorbed: Vec<ComponentId> = roots.iter().copied().skip(1).collect();
                self.merge(survivor, &absorbed);
                survivor
            }
        };

        self.assign_tags(target, &tags);
        trace!(len = seq.len(), n_tags = tags.len(), component = %target, "consumed sequence");
        Ok(target)
    }

    /// 存活组件，按编号升序；可重复枚举。
    pub fn components(&self) -> impl Iterator<Item = Component<'_>> + '_ {
        self.components
            .iter()
            .enumerate()
            .filter(|(i, rec)| rec.parent.index() == *i)
            .map(|(i, rec)| Component::new(ComponentId(i as u64), rec))
    }

    /// 每个标签及其当前所属的存活组件。
    pub fn tag_components(&self) -> impl Iterator<Item = (u64, ComponentId)> + '_ {
        self.tag_owner.iter().map(move |(&tag, &owner)| (tag, self.find(owner)))
    }

    /// 按编号取组件；已被合并的编号解析到吸收它的存活组件。
    pub fn component(&self, id: ComponentId) -> Option<Component<'_>> {
        if id.index() >= self.components.len() {
            return None;
        }
        Some(self.view(self.find(id)))
    }

    pub fn component_of_tag(&self, tag: u64) -> Option<ComponentId> {
        self.tag_owner.get(&tag).map(|&owner| self.find(owner))
    }

    /// 从 `kmer` 出发在 `search_radius` 步内找到的第一个标签所属的组件。
    pub fn get_nearest_component(&self, kmer: &str) -> Result<Component<'_>> {
        let km = self.store.kmer(kmer)?;
        let owner = self.search_tags(&[km], true).into_iter().next().ok_or_else(|| {
            GraphError::NotFound(format!(
                "no tag within {} steps of {}",
                self.params.search_radius, kmer
            ))
        })?;
        Ok(self.view(self.find(owner)))
    }

    fn view(&self, id: ComponentId) -> Component<'_> {
        Component::new(id, &self.components[id.index()])
    }

    fn sample_tags(&self, kmers: &[Kmer]) -> Vec<u64> {
        let last = kmers.len().saturating_sub(1);
        let mut since = 0usize;
        let mut tags = Vec::new();
        for (i, km) in kmers.iter().enumerate() {
            let hash = km.canonical();
            since += 1;
            if i == 0
                || i == last
                || since >= self.params.tag_density
                || self.tag_owner.contains_key(&hash)
            {
                tags.push(hash);
                since = 0;
            }
        }
        tags
    }

    /// 按层广度优先，最多 `search_radius` 步，返回遇到的标签的原始归属（未归根）。
    fn search_tags(&self, seeds: &[Kmer], first_only: bool) -> Vec<ComponentId> {
        let graph = self.graph();
        let radius = self.params.search_radius;
        let mut seen: HashSet<u64> = HashSet::new();
        let mut frontier: Vec<Kmer> =
            seeds.iter().filter(|km| seen.insert(km.canonical())).copied().collect();
        let mut found = Vec::new();

        for depth in 0..=radius {
            let mut next = Vec::new();
            for km in &frontier {
                if let Some(&owner) = self.tag_owner.get(&km.canonical()) {
                    found.push(owner);
                    if first_only {
                        return found;
                    }
                }
                if depth == radius {
                    continue;
                }
                for side in Side::BOTH {
                    for nb in graph.neighbors(km, side) {
                        if seen.insert(nb.canonical()) {
                            next.push(nb);
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        found
    }

    fn find(&self, id: ComponentId) -> ComponentId {
        let mut cur = id;
        loop {
            let parent = self.components[cur.index()].parent;
            if parent == cur {
                return cur;
            }
            cur = parent;
        }
    }

    // 路径减半
    fn find_mut(&mut self, id: ComponentId) -> ComponentId {
        let mut cur = id;
        loop {
            let parent = self.components[cur.index()].parent;
            if parent == cur {
                return cur;
            }
            let grandparent = self.components[parent.index()].parent;
            self.components[cur.index()].parent = grandparent;
            cur = grandparent;
        }
    }

    fn create_component(&mut self) -> ComponentId {
        let id = ComponentId(self.components.len() as u64);
        self.components.push(ComponentRecord::new(id));
        self.n_live += 1;
        debug!(component = %id, live = self.n_live, "new component");
        id
    }

    fn merge(&mut self, survivor: ComponentId, absorbed: &[ComponentId]) {
        for &id in absorbed {
            let record = &mut self.components[id.index()];
            let tags = std::mem::take(&mut record.tags);
            let merges = record.n_merges;
            record.parent = survivor;

            let target = &mut self.components[survivor.index()];
            target.tags.extend(tags);
            target.n_merges += merges + 1;
            self.n_live -= 1;
        }
        debug!(
            survivor = %survivor,
            absorbed = absorbed.len(),
            live = self.n_live,
            "merged components"
        );
    }

    fn assign_tags(&mut self, target: ComponentId, tags: &[u64]) {
        for &tag in tags {
            if let Some(&owner) = self.tag_owner.get(&tag) {
                // 序列上的已有标签在搜索第 0 层就会被找到，所以它的根只能是 target
                debug_assert_eq!(self.find(owner), target);
                continue;
            }
            self.tag_owner.insert(tag, target);
            self.components[target.index()].tags.insert(tag);
        }
    }
}

impl std::fmt::Debug for ComponentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentIndex")
            .field("ksize", &self.store.ksize())
            .field("params", &self.params)
            .field("n_components", &self.n_live)
            .field("n_tags", &self.tag_owner.len())
            .finish()
    }
}
