use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};

use crate::domain::{BetProposal, ConditionalEntry};

pub fn tabulate_allocation(allocation: &[BetProposal]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(18))),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(14)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Wager".into(),
                "Odds".into(),
                "Probability".into(),
                "Stake".into(),
                "Expected return".into(),
            ],
        ));
    for proposal in allocation {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                format!("{proposal}").into(),
                format!("{:.2}", proposal.odds).into(),
                format!("{:.6}", proposal.probability).into(),
                format!("{}", proposal.stake).into(),
                format!("{:.0}", proposal.expected_return).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_conditionals(conditionals: &[ConditionalEntry]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(18))),
            Col::new(Styles::default().with(MinWidth(18))),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Given".into(), "Target".into(), "Conditional".into()],
        ));
    for entry in conditionals {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                format!("{}", entry.condition).into(),
                format!("{}", entry.target).into(),
                format!("{:.6}", entry.probability).into(),
            ],
        ));
    }
    table
}
