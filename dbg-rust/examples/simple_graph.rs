//! 演示如何在 library 模式下使用 dbg-rust：计数、查邻居、组装、划分组件。
//!
//! 运行方式：
//! ```bash
//! cargo run --example simple_graph
//! ```

use dbg_rust::assembly::LinearAssembler;
use dbg_rust::graph::{GraphView, Side};
use dbg_rust::partition::ComponentIndex;
use dbg_rust::store::CountingStore;

fn main() -> dbg_rust::Result<()> {
    let k = 7;

    // 1. 构建计数表
    let contig = "CCGTAATGCCTTTCCCT";
    let store = CountingStore::new(k, 10_007, 4)?;
    let n = store.consume(contig)?;
    println!("摄入 {} 个 k-mer，表大小 {:?}", n, store.table_sizes());

    // 2. 引入一个分支：TGCCTTT 之后多出一条 GCCTTTA
    store.count("GCCTTTA")?;
    let graph = GraphView::new(&store);
    let hdn = store.kmer("TGCCTTT")?;
    println!(
        "TGCCTTT 左度={} 右度={} 分支点={}",
        graph.degree(&hdn, Side::Left),
        graph.degree(&hdn, Side::Right),
        graph.is_high_degree(&hdn)
    );

    // 3. 线性组装：遇到分支即停止
    let asm = LinearAssembler::new(graph);
    println!("从 CCGTAAT 组装: {}", asm.assemble("CCGTAAT", None)?);
    let walk = asm.walk(&store.kmer("CCGTAAT")?, Side::Right, None);
    println!("右行终止原因: {:?}", walk.end);

    // 4. 流式组件划分
    let mut index = ComponentIndex::with_defaults(CountingStore::presence(k, 10_007, 4)?)?;
    for seq in ["CCGTAATGCCTT", "ATGCCTTTCCCT", "GAGAGTTTGGACCA"] {
        let id = index.consume_sequence(seq)?;
        println!("{} -> 组件 {}", seq, id);
    }
    println!("组件数 {}，标签数 {}", index.n_components(), index.n_tags());

    println!("\n完成！");
    Ok(())
}
