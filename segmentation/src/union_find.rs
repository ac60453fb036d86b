//! Disjoint sets over `0..n`, stored as an index arena.

#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    sets: usize,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
            sets: n,
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn num_sets(&self) -> usize {
        self.sets
    }

    /// Root of `x`, compressing the path on the way up.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`, attaching the smaller under the larger.
    /// Returns `false` if they were already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        self.sets -= 1;
        true
    }

    /// Contiguous set id per element, numbered in order of first appearance.
    pub fn labels(&mut self) -> Vec<usize> {
        let n = self.len();
        let mut root_label = vec![usize::MAX; n];
        let mut next = 0;
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let r = self.find(i);
            if root_label[r] == usize::MAX {
                root_label[r] = next;
                next += 1;
            }
            labels.push(root_label[r]);
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_and_labels() {
        let mut uf = UnionFind::new(6);
        assert!(uf.union(4, 1));
        assert!(uf.union(5, 2));
        assert!(uf.union(2, 4));
        assert!(!uf.union(1, 5));
        assert_eq!(uf.num_sets(), 3);
        assert_eq!(uf.labels(), vec![0, 1, 1, 2, 1, 1]);
    }

    #[test]
    fn test_path_compression_flattens() {
        let mut uf = UnionFind::new(5);
        for i in 0..4 {
            uf.union(i, i + 1);
        }
        let root = uf.find(4);
        for i in 0..5 {
            assert_eq!(uf.find(i), root);
            assert_eq!(uf.parent[i], root);
        }
    }
}
