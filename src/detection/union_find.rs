/// Disjoint-set forest over dense component indices, with path compression.
#[derive(Clone, Debug, Default)]
pub(crate) struct DisjointSet {
    parents: Vec<usize>,
}

impl DisjointSet {
    /// Adds a singleton set and returns its index.
    pub(crate) fn make_set(&mut self) -> usize {
        let id = self.parents.len();
        self.parents.push(id);
        id
    }

    pub(crate) fn len(&self) -> usize {
        self.parents.len()
    }

    /// Root of the set containing `id`; compresses the path on the way.
    pub(crate) fn find(&mut self, id: usize) -> usize {
        let mut root = id;
        while self.parents[root] != root {
            root = self.parents[root];
        }
        let mut node = id;
        while self.parents[node] != root {
            let parent = self.parents[node];
            self.parents[node] = root;
            node = parent;
        }
        root
    }

    /// Joins two sets, returns the surviving root.
    pub(crate) fn union(&mut self, left: usize, right: usize) -> usize {
        let left = self.find(left);
        let right = self.find(right);
        if left != right {
            self.parents[left] = right;
        }
        right
    }
}
