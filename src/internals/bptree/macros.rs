macro_rules! leaf_ref {
    ($sb:expr, $id:expr) => {{
        match $sb.node_ref($id) {
            Node::Leaf(lref) => lref,
            Node::Branch(_) => unreachable!("node {} is a branch, expected a leaf", $id),
        }
    }};
}

macro_rules! leaf_mut {
    ($sb:expr, $id:expr) => {{
        match $sb.node_mut($id) {
            Node::Leaf(lmut) => lmut,
            Node::Branch(_) => unreachable!("node {} is a branch, expected a leaf", $id),
        }
    }};
}

macro_rules! branch_ref {
    ($sb:expr, $id:expr) => {{
        match $sb.node_ref($id) {
            Node::Branch(bref) => bref,
            Node::Leaf(_) => unreachable!("node {} is a leaf, expected a branch", $id),
        }
    }};
}

macro_rules! branch_mut {
    ($sb:expr, $id:expr) => {{
        match $sb.node_mut($id) {
            Node::Branch(bmut) => bmut,
            Node::Leaf(_) => unreachable!("node {} is a leaf, expected a branch", $id),
        }
    }};
}
