use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

struct Frame<V> {
  vertex: V,
  /// index of the next successor to visit
  succ: usize,
}

/// Tarjan's algorithm with an explicit frame stack.
///
/// Every vertex must appear as a key of `graph`; successors must be keys
/// as well. A component is emitted before every component that can reach
/// it, so reversing the result yields an order where dependency sources
/// come first.
pub(crate) fn strongly_connected_components<V>(
  graph: &IndexMap<V, IndexSet<V>>,
) -> Vec<Vec<V>>
where
  V: Copy + Eq + Hash,
{
  let mut next_index = 0usize;
  let mut indices = HashMap::<V, usize>::new();
  let mut lowlink = HashMap::<V, usize>::new();
  let mut on_stack = HashSet::<V>::new();
  let mut stack = Vec::<V>::new();
  let mut components = Vec::new();

  for &root in graph.keys() {
    if indices.contains_key(&root) {
      continue;
    }

    let mut frames = vec![Frame { vertex: root, succ: 0 }];
    indices.insert(root, next_index);
    lowlink.insert(root, next_index);
    next_index += 1;
    stack.push(root);
    on_stack.insert(root);

    loop {
      let (v, succ_ix) = match frames.last_mut() {
        Some(frame) => {
          let pair = (frame.vertex, frame.succ);
          frame.succ += 1;
          pair
        }
        None => break,
      };

      match graph[&v].get_index(succ_ix) {
        Some(&w) if !indices.contains_key(&w) => {
          indices.insert(w, next_index);
          lowlink.insert(w, next_index);
          next_index += 1;
          stack.push(w);
          on_stack.insert(w);
          frames.push(Frame { vertex: w, succ: 0 });
        }
        Some(&w) => {
          if on_stack.contains(&w) {
            // w is on the visitation stack, hence in the current SCC
            let low = lowlink[&v].min(indices[&w]);
            lowlink.insert(v, low);
          }
        }
        None => {
          // all successors of v explored
          frames.pop();
          if let Some(parent) = frames.last() {
            let low = lowlink[&parent.vertex].min(lowlink[&v]);
            lowlink.insert(parent.vertex, low);
          }

          if lowlink[&v] == indices[&v] {
            // v roots a component
            let mut component = Vec::new();
            while let Some(w) = stack.pop() {
              on_stack.remove(&w);
              component.push(w);
              if w == v {
                break;
              }
            }
            components.push(component);
          }
        }
      }
    }
  }

  components
}
